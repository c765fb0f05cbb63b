use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::hls::{self, Playlist};
use crate::reader::ProxiedPage;

/// What the episode screen hands to a downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub filename: String,
}

/// Saves a stream to disk. Returns the written path.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, stream_url: &str, suggested_filename: &str) -> Result<PathBuf>;
}

/// Fetches an HLS stream's segments and concatenates them into a `.ts` file.
#[derive(Debug, Clone)]
pub struct HlsDownloader {
    http: Client,
    output_dir: PathBuf,
    concurrency: usize,
}

impl HlsDownloader {
    pub fn new(http: Client, output_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self { http, output_dir: output_dir.into(), concurrency: concurrency.max(1) }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn get(&self, url: Url) -> Result<Response> {
        self.http
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("fetching {url}"))
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Bytes> {
        Ok(self.get(url).await?.bytes().await?)
    }

    /// Media segments for playlist `text` fetched from `url`, following the best
    /// variant of a master playlist.
    async fn segments(&self, mut text: String, url: &Url) -> Result<Vec<Url>> {
        let mut current = url.clone();
        // A master playlist points at media playlists, never at another master.
        for _ in 0..2 {
            match hls::parse_playlist(&text, &current)? {
                Playlist::Media(segs) => return Ok(segs.into_iter().map(|s| s.uri).collect()),
                master @ Playlist::Master(_) => {
                    let Some(best) = master.best_variant() else {
                        bail!("master playlist without variants")
                    };
                    tracing::debug!(variant = %best.uri, bandwidth = ?best.bandwidth, "following variant");
                    current = best.uri.clone();
                    text = self.get(current.clone()).await?.text().await?;
                }
            }
        }
        bail!("playlist nesting too deep: {url}")
    }

    // Classify the first response: playlist (by path, content type or `#EXTM3U`
    // header) or a plain file whose first chunk is already read.
    async fn open_source(&self, url: &Url) -> Result<Source> {
        let mut resp = self.get(url.clone()).await?;
        let by_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("mpegurl"));
        let head = resp.chunk().await?.unwrap_or_default();
        if !(url.path().ends_with(".m3u8") || by_type || looks_like_playlist(&head)) {
            return Ok(Source::File { head, rest: resp });
        }
        let mut body = head.to_vec();
        while let Some(chunk) = resp.chunk().await? {
            body.extend_from_slice(&chunk);
        }
        let text = String::from_utf8_lossy(&body).into_owned();
        Ok(Source::Segments(self.segments(text, url).await?))
    }

    async fn write_source(&self, source: Source, file: &mut tokio::fs::File) -> Result<()> {
        match source {
            Source::Segments(parts) => {
                let mut chunks = futures::stream::iter(parts.into_iter().map(|u| self.fetch_bytes(u)))
                    .buffered(self.concurrency);
                while let Some(chunk) = chunks.try_next().await? {
                    file.write_all(&chunk).await?;
                }
            }
            Source::File { head, mut rest } => {
                file.write_all(&head).await?;
                while let Some(chunk) = rest.chunk().await? {
                    file.write_all(&chunk).await?;
                }
            }
        }
        file.flush().await?;
        Ok(())
    }
}

enum Source {
    Segments(Vec<Url>),
    File { head: Bytes, rest: Response },
}

fn looks_like_playlist(head: &[u8]) -> bool {
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = head.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(head.len());
    head[start..].starts_with(b"#EXTM3U")
}

#[async_trait]
impl Downloader for HlsDownloader {
    async fn download(&self, stream_url: &str, suggested_filename: &str) -> Result<PathBuf> {
        let url = Url::parse(stream_url).with_context(|| format!("invalid stream url: {stream_url}"))?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating download dir: {}", self.output_dir.display()))?;

        let source = self.open_source(&url).await?;
        let ext = match &source {
            Source::Segments(parts) => {
                tracing::info!(segments = parts.len(), "downloading hls stream");
                "ts"
            }
            Source::File { .. } => extension_of(&url).unwrap_or("mp4"),
        };
        let path = self.output_dir.join(format!("{}.{ext}", sanitize_filename(suggested_filename)));
        tracing::info!(file = %path.display(), "downloading");

        let tmp = path.with_extension("part");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("creating {}", tmp.display()))?;
        let written = self.write_source(source, &mut file).await;
        drop(file);
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::warn!(file = %tmp.display(), error = %cleanup, "could not remove partial download");
            }
            return Err(e);
        }
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("moving {} into place", tmp.display()))?;
        tracing::info!(file = %path.display(), "download finished");
        Ok(path)
    }
}

fn extension_of(url: &Url) -> Option<&str> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext).filter(|e| !e.is_empty() && e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Replace characters that are not allowed in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fetch chapter pages through the image proxy and pack them as a CBZ.
/// Returns `false` when the file exists and `force_overwrite` is off, or there are no pages.
pub async fn download_chapter_cbz(
    http: &Client,
    pages: &[ProxiedPage],
    output_file: &Path,
    force_overwrite: bool,
) -> Result<bool> {
    if !force_overwrite && tokio::fs::try_exists(output_file).await.unwrap_or(false) {
        return Ok(false);
    }
    if pages.is_empty() {
        return Ok(false);
    }

    let mut entries = Vec::with_capacity(pages.len());
    for page in pages {
        let resp = http.get(page.url.clone()).send().await?.error_for_status()?;
        let ext = content_type_ext(resp.headers().get(CONTENT_TYPE));
        let bytes = resp.bytes().await?;
        entries.push((format!("{:04}.{ext}", page.index + 1), bytes));
    }

    if let Some(parent) = output_file.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let out = output_file.to_path_buf();
    tokio::task::spawn_blocking(move || write_cbz(&out, &entries)).await??;
    tracing::info!(file = %output_file.display(), pages = pages.len(), "chapter saved");
    Ok(true)
}

fn content_type_ext(value: Option<&reqwest::header::HeaderValue>) -> &'static str {
    match value.and_then(|v| v.to_str().ok()) {
        Some(ct) if ct.starts_with("image/png") => "png",
        Some(ct) if ct.starts_with("image/webp") => "webp",
        Some(ct) if ct.starts_with("image/gif") => "gif",
        _ => "jpg",
    }
}

/// Write `(name, bytes)` entries into a deflated zip at `path`.
pub fn write_cbz(path: &Path, entries: &[(String, Bytes)]) -> Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, canned};
    use std::io::Read;

    const MASTER: &str = "#EXTM3U\n\
        #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\nlo/index.m3u8\n\
        #EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720\nhi/index.m3u8\n";
    const MEDIA: &str = "#EXTM3U\n#EXTINF:4.0,\nseg0.ts\n#EXTINF:4.0,\nseg1.ts\n#EXT-X-ENDLIST\n";

    #[tokio::test]
    async fn master_playlist_downloads_best_variant_in_order() {
        let base = testing::serve(vec![
            ("/hls/master.m3u8", canned(200, "application/vnd.apple.mpegurl", MASTER)),
            ("/hls/lo/index.m3u8", canned(200, "application/vnd.apple.mpegurl", "#EXTM3U\nlow.ts\n")),
            ("/hls/hi/index.m3u8", canned(200, "application/vnd.apple.mpegurl", MEDIA)),
            ("/hls/hi/seg0.ts", canned(200, "video/mp2t", "AAA")),
            ("/hls/hi/seg1.ts", canned(200, "video/mp2t", "BBB")),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dl = HlsDownloader::new(testing::http(), dir.path(), 2);

        let path = dl.download(base.join("hls/master.m3u8").unwrap().as_str(), "Show_episode_1").await.unwrap();
        assert_eq!(path, dir.path().join("Show_episode_1.ts"));
        assert_eq!(std::fs::read(&path).unwrap(), b"AAABBB");
        assert!(!dir.path().join("Show_episode_1.part").exists());
    }

    #[tokio::test]
    async fn playlist_without_m3u8_extension_is_detected_by_content() {
        let base = testing::serve(vec![
            ("/m3u8-proxy", canned(200, "text/plain", "#EXTM3U\n#EXTINF:4,\n/seg.ts\n")),
            ("/seg.ts", canned(200, "video/mp2t", "XYZ")),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dl = HlsDownloader::new(testing::http(), dir.path(), 4);

        let url = base.join("m3u8-proxy?url=https%3A%2F%2Fcdn.example.org%2Fa.m3u8").unwrap();
        let path = dl.download(url.as_str(), "ep").await.unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ts"));
        assert_eq!(std::fs::read(&path).unwrap(), b"XYZ");
    }

    #[tokio::test]
    async fn plain_file_is_saved_as_is() {
        let base = testing::serve(vec![("/v/ep1.mp4", canned(200, "video/mp4", "MP4DATA"))]).await;
        let dir = tempfile::tempdir().unwrap();
        let dl = HlsDownloader::new(testing::http(), dir.path(), 4);

        let path = dl.download(base.join("v/ep1.mp4").unwrap().as_str(), "ep").await.unwrap();
        assert_eq!(path, dir.path().join("ep.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"MP4DATA");
    }

    #[tokio::test]
    async fn failed_segment_leaves_no_partial_file() {
        let base = testing::serve(vec![
            ("/hls/index.m3u8", canned(200, "application/vnd.apple.mpegurl", MEDIA)),
            ("/hls/seg0.ts", canned(200, "video/mp2t", "AAA")),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dl = HlsDownloader::new(testing::http(), dir.path(), 1);

        let err = dl.download(base.join("hls/index.m3u8").unwrap().as_str(), "ep").await.unwrap_err();
        assert!(format!("{err:#}").contains("seg1.ts"), "{err:#}");
        assert!(!dir.path().join("ep.part").exists());
        assert!(!dir.path().join("ep.ts").exists());
    }

    #[tokio::test]
    async fn chapter_pages_are_fetched_into_cbz() {
        let base = testing::serve(vec![
            ("/p/1", canned(200, "image/png", "one")),
            ("/p/2", canned(200, "image/jpeg", "two")),
        ])
        .await;
        let pages: Vec<ProxiedPage> = (0..2)
            .map(|i| ProxiedPage { index: i, url: base.join(&format!("p/{}", i + 1)).unwrap() })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("ch1.cbz");

        assert!(download_chapter_cbz(&testing::http(), &pages, &out, false).await.unwrap());
        let archive = zip::ZipArchive::new(std::fs::File::open(&out).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"0001.png") && names.contains(&"0002.jpg"), "{names:?}");
    }

    #[test]
    fn filenames_lose_path_separators() {
        assert_eq!(sanitize_filename("Fate/Zero_episode_1[Weebixx]"), "Fate_Zero_episode_1[Weebixx]");
        assert_eq!(sanitize_filename("Re:Zero?"), "Re_Zero_");
        assert_eq!(sanitize_filename(" .. "), "download");
    }

    #[test]
    fn extension_comes_from_last_segment() {
        let u = Url::parse("https://cdn.example.org/v/ep1.mp4?token=x").unwrap();
        assert_eq!(extension_of(&u), Some("mp4"));
        let u = Url::parse("https://cdn.example.org/v/ep1").unwrap();
        assert_eq!(extension_of(&u), None);
    }

    #[test]
    fn cbz_keeps_entry_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.cbz");
        let entries = vec![
            ("0001.jpg".to_string(), Bytes::from_static(b"first")),
            ("0002.png".to_string(), Bytes::from_static(b"second")),
        ];
        write_cbz(&path, &entries).unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut body = String::new();
        archive.by_index(1).unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "0001.jpg");
        assert_eq!(body, "second");
    }

    #[tokio::test]
    async fn existing_cbz_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.cbz");
        std::fs::write(&path, b"keep").unwrap();
        let page = ProxiedPage { index: 0, url: Url::parse("http://127.0.0.1:9/never").unwrap() };
        let wrote = download_chapter_cbz(&Client::new(), &[page], &path, false).await.unwrap();
        assert!(!wrote);
        assert_eq!(std::fs::read(&path).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn empty_chapter_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ch1.cbz");
        assert!(!download_chapter_cbz(&Client::new(), &[], &path, true).await.unwrap());
        assert!(!path.exists());
    }
}
