pub mod api;
pub mod client;
pub mod config;
pub mod download;
pub mod episode;
pub mod error;
pub mod hls;
pub mod metadata;
pub mod navigation;
pub mod reader;
pub mod resolver;
pub mod routes;
pub mod shell;
pub mod state;
pub mod types;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::ContentApi;
    pub use crate::client::ConsumetClient;
    pub use crate::config::Config;
    pub use crate::download::{DownloadRequest, Downloader, HlsDownloader};
    pub use crate::episode::EpisodeScreen;
    pub use crate::error::ApiError;
    pub use crate::metadata::{MetadataReader, PageMetadata};
    pub use crate::navigation::{Bounds, Step};
    pub use crate::reader::{ImageProxy, MangaReader, ProxiedPage};
    pub use crate::routes::Route;
    pub use crate::state::Phase;
    pub use crate::types::{AnimeInfo, Chapter, Episode, MangaInfo, Page, StreamSource, Title};
    pub use crate::Weebixx;
}

use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::client::ConsumetClient;
use crate::config::Config;
use crate::download::HlsDownloader;
use crate::episode::EpisodeScreen;
use crate::metadata::{MetadataContext, MetadataReader};
use crate::reader::{ImageProxy, MangaReader};

/// Composition root. Owns the API client, the downloader and the shared page-metadata
/// context, and builds screens wired to them.
pub struct Weebixx {
    config: Config,
    api: Arc<ConsumetClient>,
    proxy: ImageProxy,
    metadata: MetadataContext,
    downloader: HlsDownloader,
}

impl Weebixx {
    pub fn new(config: Config) -> Result<Self> {
        let api = ConsumetClient::from_config(&config).context("building API client")?;
        let proxy = ImageProxy {
            endpoint: Url::parse(&config.image_proxy_url)
                .with_context(|| format!("invalid image proxy url: {}", config.image_proxy_url))?,
            referer: config.manga_referer.clone(),
        };
        let downloader = HlsDownloader::new(
            api.http().clone(),
            config.resolved_download_dir(),
            config.download_concurrency,
        );
        Ok(Self { config, api: Arc::new(api), proxy, metadata: MetadataContext::new(), downloader })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ConsumetClient {
        &self.api
    }

    pub fn downloader(&self) -> &HlsDownloader {
        &self.downloader
    }

    /// Read side of the page metadata, for the layout shell.
    pub fn metadata(&self) -> MetadataReader {
        self.metadata.reader()
    }

    pub fn episode_screen(&self, anime_id: &str, episode_number: &str) -> EpisodeScreen<ConsumetClient> {
        EpisodeScreen::new(self.api.clone(), self.config.site_name.clone(), anime_id, episode_number)
    }

    /// The reader is the only holder of a metadata write handle.
    pub fn manga_reader(&self, manga_id: &str, chapter_segment: &str) -> MangaReader<ConsumetClient> {
        MangaReader::new(
            self.api.clone(),
            self.config.site_name.clone(),
            self.proxy.clone(),
            self.metadata.writer(),
            manga_id,
            chapter_segment,
        )
    }
}
