//! Minimal m3u8 reader: enough to pick a variant and list media segments.

use anyhow::{anyhow, bail, Result};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub uri: Url,
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub uri: Url,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(Vec<Variant>),
    Media(Vec<Segment>),
}

impl Playlist {
    /// Highest-bandwidth variant of a master playlist.
    pub fn best_variant(&self) -> Option<&Variant> {
        match self {
            Playlist::Master(v) => v.iter().max_by_key(|v| v.bandwidth.unwrap_or(0)),
            Playlist::Media(_) => None,
        }
    }
}

/// Parse playlist text fetched from `base`; relative URIs are resolved against it.
pub fn parse_playlist(content: &str, base: &Url) -> Result<Playlist> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    if lines.next() != Some("#EXTM3U") {
        bail!("not an m3u8 playlist: {base}");
    }

    let mut variants = Vec::new();
    let mut segments = Vec::new();
    let mut pending_variant: Option<(Option<u64>, Option<String>)> = None;
    let mut pending_duration: Option<f64> = None;

    for line in lines {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending_variant = Some((
                attribute(attrs, "BANDWIDTH").and_then(|b| b.parse().ok()),
                attribute(attrs, "RESOLUTION"),
            ));
        } else if let Some(rest) = line.strip_prefix("#EXTINF:") {
            pending_duration = rest.split(',').next().and_then(|d| d.trim().parse().ok());
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-KEY:") {
            match attribute(attrs, "METHOD").as_deref() {
                None | Some("NONE") => {}
                Some(method) => bail!("encrypted playlist ({method}) is not supported"),
            }
        } else if line.starts_with('#') {
            continue;
        } else {
            let uri = base.join(line).map_err(|e| anyhow!("bad uri {line:?} in playlist: {e}"))?;
            match pending_variant.take() {
                Some((bandwidth, resolution)) => variants.push(Variant { uri, bandwidth, resolution }),
                None => segments.push(Segment { uri, duration: pending_duration.take() }),
            }
        }
    }

    if !variants.is_empty() {
        return Ok(Playlist::Master(variants));
    }
    Ok(Playlist::Media(segments))
}

// Reads `NAME=value` or `NAME="value"` from an attribute list.
fn attribute(attrs: &str, name: &str) -> Option<String> {
    let mut rest = attrs;
    while !rest.is_empty() {
        let (key, after) = rest.split_once('=')?;
        let (value, tail) = if let Some(quoted) = after.strip_prefix('"') {
            let end = quoted.find('"')?;
            (&quoted[..end], quoted[end + 1..].trim_start_matches(','))
        } else {
            match after.split_once(',') {
                Some((v, t)) => (v, t),
                None => (after, ""),
            }
        };
        if key.trim() == name {
            return Some(value.to_string());
        }
        rest = tail;
    }
    None
}
