use crate::types::{Chapter, Episode};

/// Index of the episode whose number renders exactly as `requested`.
pub fn episode_index(episodes: &[Episode], requested: &str) -> Option<usize> {
    episodes.iter().position(|e| e.number.as_str() == requested)
}

/// Index of the chapter whose id equals the percent-decoded route segment.
///
/// A segment that is not valid percent-encoding is compared verbatim.
pub fn chapter_index(chapters: &[Chapter], route_segment: &str) -> Option<usize> {
    let decoded = urlencoding::decode(route_segment)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| route_segment.to_string());
    chapters.iter().position(|c| c.id == decoded)
}
