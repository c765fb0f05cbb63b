use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{AnimeInfo, MangaInfo, Page, WatchResponse};

/// Remote content service consumed by the screens.
///
/// `ConsumetClient` is the HTTP implementation; tests plug in a scripted fake.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn anime_info(&self, anime_id: &str) -> Result<AnimeInfo, ApiError>;
    async fn watch(&self, episode_id: &str) -> Result<WatchResponse, ApiError>;
    async fn manga_info(&self, manga_id: &str) -> Result<MangaInfo, ApiError>;
    async fn read(&self, chapter_id: &str) -> Result<Vec<Page>, ApiError>;
}
