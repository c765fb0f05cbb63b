//! Scripted `ContentApi` used by the screen tests, and a loopback HTTP server
//! for the client and downloader tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use crate::api::ContentApi;
use crate::error::ApiError;
use crate::types::{AnimeInfo, Chapter, Episode, MangaInfo, Page, StreamSource, Title, WatchResponse};

#[derive(Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Status(u16, String),
    Network(String),
}

impl<T: Clone> Reply<T> {
    fn produce(&self, url: &str) -> Result<T, ApiError> {
        match self {
            Reply::Ok(v) => Ok(v.clone()),
            Reply::Status(status, body) => Err(ApiError::from_status(url, *status, body)),
            Reply::Network(msg) => Err(ApiError::Network { url: url.into(), message: msg.clone() }),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub anime: HashMap<String, Reply<AnimeInfo>>,
    pub watch: HashMap<String, Reply<WatchResponse>>,
    pub manga: HashMap<String, Reply<MangaInfo>>,
    pub read: HashMap<String, Reply<Vec<Page>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn lookup<T: Clone>(map: &HashMap<String, Reply<T>>, key: &str, url: &str) -> Result<T, ApiError> {
        map.get(key)
            .cloned()
            .unwrap_or_else(|| Reply::Status(404, r#"{"message":"not found"}"#.into()))
            .produce(url)
    }
}

#[async_trait]
impl ContentApi for FakeApi {
    async fn anime_info(&self, anime_id: &str) -> Result<AnimeInfo, ApiError> {
        self.record(format!("info:{anime_id}"));
        Self::lookup(&self.anime, anime_id, &format!("/info/{anime_id}"))
    }

    async fn watch(&self, episode_id: &str) -> Result<WatchResponse, ApiError> {
        self.record(format!("watch:{episode_id}"));
        Self::lookup(&self.watch, episode_id, &format!("/watch/{episode_id}"))
    }

    async fn manga_info(&self, manga_id: &str) -> Result<MangaInfo, ApiError> {
        self.record(format!("manga:{manga_id}"));
        Self::lookup(&self.manga, manga_id, &format!("/info/{manga_id}"))
    }

    async fn read(&self, chapter_id: &str) -> Result<Vec<Page>, ApiError> {
        self.record(format!("read:{chapter_id}"));
        Self::lookup(&self.read, chapter_id, &format!("/read?chapterId={chapter_id}"))
    }
}

pub(crate) fn title(romaji: &str) -> Title {
    Title { romaji: Some(romaji.into()), english: None, native: None }
}

pub(crate) fn anime(id: &str, name: &str, numbers: &[u32]) -> AnimeInfo {
    AnimeInfo {
        id: id.into(),
        title: title(name),
        episodes: numbers
            .iter()
            .map(|n| Episode {
                id: format!("{id}-episode-{n}"),
                number: (*n).into(),
                title: Some(format!("Episode title {n}")),
                image: None,
                air_date: Some("2023-01-07T15:00:00Z".into()),
                description: None,
            })
            .collect(),
    }
}

pub(crate) fn sources(pairs: &[(&str, &str)]) -> WatchResponse {
    WatchResponse {
        sources: pairs
            .iter()
            .map(|(q, u)| StreamSource { url: (*u).into(), quality: (*q).into(), is_m3u8: Some(true) })
            .collect(),
    }
}

pub(crate) fn manga(id: &str, name: &str, chapter_ids: &[&str]) -> MangaInfo {
    MangaInfo {
        id: id.into(),
        title: title(name),
        image: Some(format!("https://img.example.org/{id}.jpg")),
        description: None,
        chapters: chapter_ids
            .iter()
            .enumerate()
            .map(|(i, cid)| Chapter {
                id: (*cid).into(),
                chapter_number: Some((i + 1).to_string()),
                title: Some(format!("Chapter title {}", i + 1)),
            })
            .collect(),
    }
}

pub(crate) fn pages(n: usize, prefix: &str) -> Vec<Page> {
    (1..=n)
        .map(|i| Page { img: format!("https://uploads.example.org/{prefix}/{i}.png"), page: Some(i as u32) })
        .collect()
}

/// A fixed response served by [`serve`].
pub(crate) struct Canned {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

pub(crate) fn canned(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Canned {
    Canned { status, content_type, body: body.into() }
}

/// Serve `routes` (request path without query) on a loopback port until the test
/// runtime shuts down. Unknown paths answer 404. Returns the server's root URL.
pub(crate) async fn serve(routes: Vec<(&str, Canned)>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<String, Canned>> =
        Arc::new(routes.into_iter().map(|(path, c)| (path.to_string(), c)).collect());
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match sock.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let target = head.split_whitespace().nth(1).unwrap_or("/");
                let path = target.split('?').next().unwrap_or(target);
                let missing = canned(404, "text/plain", "no such route");
                let resp = routes.get(path).unwrap_or(&missing);
                let header = format!(
                    "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    resp.status,
                    resp.content_type,
                    resp.body.len()
                );
                let _ = sock.write_all(header.as_bytes()).await;
                let _ = sock.write_all(&resp.body).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// Root URL of a port nothing listens on.
pub(crate) async fn closed_port() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}/")).unwrap()
}

/// HTTP client that ignores proxy settings from the environment.
pub(crate) fn http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
