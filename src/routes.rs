use url::Url;

/// Navigation targets understood by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/episode/:animeId/:episodeNumber`
    Episode { anime_id: String, episode_number: String },
    /// `/manga-reader/:mangaId/:chapterId`; `chapter_id` is kept percent-encoded.
    MangaReader { manga_id: String, chapter_id: String },
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segs.as_slice() {
            ["episode", anime, number] => Some(Self::Episode {
                anime_id: (*anime).to_string(),
                episode_number: (*number).to_string(),
            }),
            ["manga-reader", manga, chapter] => Some(Self::MangaReader {
                manga_id: (*manga).to_string(),
                chapter_id: (*chapter).to_string(),
            }),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Episode { anime_id, episode_number } => format!("/episode/{anime_id}/{episode_number}"),
            Self::MangaReader { manga_id, chapter_id } => format!("/manga-reader/{manga_id}/{chapter_id}"),
        }
    }
}

pub fn episode_path(anime_id: &str, number: &str) -> String {
    format!("/episode/{anime_id}/{number}")
}

pub fn reader_path(manga_id: &str, chapter_id: &str) -> String {
    format!("/manga-reader/{}/{}", manga_id, urlencoding::encode(chapter_id))
}

pub fn anime_path(anime_id: &str) -> String {
    format!("/anime/{anime_id}")
}

pub fn episode_list_path(anime_id: &str) -> String {
    format!("/episodelist/{anime_id}")
}

/// Route an image through the proxy with the source referrer attached.
pub fn proxied_image_url(proxy: &Url, img: &str, referer: &str) -> Url {
    let mut url = proxy.clone();
    url.query_pairs_mut().append_pair("url", img).append_pair("referer", referer);
    url
}
