use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Multi-script title object returned by the content API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
}

impl Title {
    /// Display title: romaji, then english, then native.
    pub fn display(&self) -> &str {
        [&self.romaji, &self.english, &self.native]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

/// `GET /info/{animeId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeInfo {
    pub id: String,
    #[serde(default)]
    pub title: Title,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: String,
    pub number: EpisodeNumber,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Episode {
    /// Date part of an ISO timestamp (`2023-01-07T15:00:00Z` -> `2023-01-07`).
    pub fn release_date(&self) -> Option<&str> {
        let raw = self.air_date.as_deref()?;
        Some(raw.split_once('T').map(|(d, _)| d).unwrap_or(raw))
    }
}

/// Episode number in the form routes use: `2`, or `1.5` for a recap.
///
/// The API sends a JSON number; integral values render without a fraction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeNumber(String);

impl EpisodeNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for EpisodeNumber {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for EpisodeNumber {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(de)? {
            serde_json::Value::Number(n) => Ok(Self(number_text(&n))),
            serde_json::Value::String(s) if !s.is_empty() => Ok(Self(s)),
            other => Err(D::Error::custom(format!("invalid episode number: {other}"))),
        }
    }
}

impl Serialize for EpisodeNumber {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<f64>() {
            Ok(f) if f.is_finite() => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    ser.serialize_i64(f as i64)
                } else {
                    ser.serialize_f64(f)
                }
            }
            _ => ser.serialize_str(&self.0),
        }
    }
}

// `2.0` renders as `2`, matching how the site builds episode links.
fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// `GET /watch/{episodeId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchResponse {
    #[serde(default)]
    pub sources: Vec<StreamSource>,
}

/// A quality-labelled playable URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSource {
    pub url: String,
    pub quality: String,
    #[serde(default, rename = "isM3U8")]
    pub is_m3u8: Option<bool>,
}

/// `GET /info/{mangaId}?provider=..`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaInfo {
    pub id: String,
    #[serde(default)]
    pub title: Title,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    #[serde(default, rename = "chapterNumber", deserialize_with = "string_or_number")]
    pub chapter_number: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One entry of `GET /read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub img: String,
    #[serde(default)]
    pub page: Option<u32>,
}

// Providers disagree on whether chapter numbers are strings or numbers.
fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anime_info_parses_camel_case_fields() {
        let body = r#"{
            "id": "21",
            "title": {"romaji": "One Piece", "english": null},
            "episodes": [
                {"id": "one-piece-episode-1", "number": 1, "title": "I'm Luffy!", "airDate": "1999-10-20T00:00:00Z"}
            ]
        }"#;
        let info: AnimeInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.title.display(), "One Piece");
        assert_eq!(info.episodes[0].release_date(), Some("1999-10-20"));
        assert_eq!(info.episodes[0].description, None);
    }

    #[test]
    fn episode_numbers_keep_their_route_form() {
        let body = r#"[{"id": "a", "number": 1}, {"id": "b", "number": 1.5}, {"id": "c", "number": 2.0}]"#;
        let episodes: Vec<Episode> = serde_json::from_str(body).unwrap();
        let numbers: Vec<&str> = episodes.iter().map(|e| e.number.as_str()).collect();
        assert_eq!(numbers, ["1", "1.5", "2"]);
        assert_eq!(serde_json::to_string(&episodes[1].number).unwrap(), "1.5");
        assert!(serde_json::from_str::<Episode>(r#"{"id": "d", "number": null}"#).is_err());
    }

    #[test]
    fn chapter_number_accepts_strings_and_numbers() {
        let body = r#"[{"id": "a", "chapterNumber": "12.5"}, {"id": "b", "chapterNumber": 3}, {"id": "c"}]"#;
        let chapters: Vec<Chapter> = serde_json::from_str(body).unwrap();
        assert_eq!(chapters[0].chapter_number.as_deref(), Some("12.5"));
        assert_eq!(chapters[1].chapter_number.as_deref(), Some("3"));
        assert_eq!(chapters[2].chapter_number, None);
    }

    #[test]
    fn title_falls_back_past_empty_romaji() {
        let t = Title { romaji: Some(String::new()), english: None, native: Some("ワンピース".into()) };
        assert_eq!(t.display(), "ワンピース");
        assert_eq!(Title::default().display(), "");
    }
}
