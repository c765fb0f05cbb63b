use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub anime_api_url: String,
    pub manga_api_url: String,
    pub image_proxy_url: String,
    pub manga_provider: String,
    pub manga_referer: String,
    pub site_name: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub download_dir: Option<PathBuf>,
    pub download_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anime_api_url: "https://api.consumet.org/meta/anilist".into(),
            manga_api_url: "https://api.consumet.org/meta/anilist-manga".into(),
            image_proxy_url: "https://api.consumet.org/utils/image-proxy".into(),
            manga_provider: "mangadex".into(),
            manga_referer: "https://mangadex.org/".into(),
            site_name: "Weebixx".into(),
            user_agent: concat!("weebixx/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_secs: 30,
            download_dir: None,
            download_concurrency: 4,
        }
    }
}

impl Config {
    /// Load from `path` (or the per-user default location) and apply `WEEBIXX_*` overrides.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);
        let mut cfg = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("reading config: {}", p.display()))?;
                Self::from_toml(&raw).with_context(|| format!("parsing config: {}", p.display()))?
            }
            _ => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from an environment lookup; unparsable numbers are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = non_empty("WEEBIXX_ANIME_API_URL") {
            self.anime_api_url = v;
        }
        if let Some(v) = non_empty("WEEBIXX_MANGA_API_URL") {
            self.manga_api_url = v;
        }
        if let Some(v) = non_empty("WEEBIXX_IMAGE_PROXY_URL") {
            self.image_proxy_url = v;
        }
        if let Some(v) = non_empty("WEEBIXX_MANGA_PROVIDER") {
            self.manga_provider = v;
        }
        if let Some(v) = non_empty("WEEBIXX_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.request_timeout_secs = v;
        }
        if let Some(v) = non_empty("WEEBIXX_DOWNLOAD_DIR") {
            self.download_dir = Some(PathBuf::from(v));
        }
    }

    /// Download directory, defaulting to `<data dir>/downloads`.
    pub fn resolved_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|p| p.data_dir().join("downloads"))
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "weebixx", "weebixx")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|p| p.config_dir().join("config.toml"))
}
