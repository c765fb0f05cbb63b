//! Text rendering of the two screens and the layout header.

use std::fmt::Write;

use crate::api::ContentApi;
use crate::episode::EpisodeScreen;
use crate::metadata::PageMetadata;
use crate::navigation::Bounds;
use crate::reader::MangaReader;
use crate::routes;
use crate::state::Phase;

/// Layout shell header fed from the shared page metadata.
pub fn render_layout_header(meta: &PageMetadata) -> String {
    let mut out = String::new();
    if !meta.title.is_empty() {
        let _ = writeln!(out, "== {} ==", meta.title);
    }
    if !meta.description.is_empty() {
        let _ = writeln!(out, "{}", meta.description);
    }
    if let Some(img) = &meta.image {
        let _ = writeln!(out, "[cover] {img}");
    }
    out
}

pub fn render_episode<A: ContentApi + ?Sized>(screen: &EpisodeScreen<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", screen.document_title());
    if let Some(anime) = screen.anime() {
        let _ = writeln!(out, "{}  <{}>", anime.title.display(), routes::anime_path(&anime.id));
    }
    if let Some(ep) = screen.current_episode() {
        let _ = writeln!(out, "Episode {}", ep.number);
    }

    if !screen.streams().is_empty() {
        let qualities: Vec<String> = screen
            .streams()
            .iter()
            .map(|s| match screen.quality() {
                Some(q) if q == s.quality => format!("[{}]", s.quality),
                _ => s.quality.clone(),
            })
            .collect();
        let _ = writeln!(out, "Quality: {}", qualities.join(" "));
    }
    let bounds = screen.bounds();
    out.push_str(&nav_bar(bounds, "Prev", "Next"));
    for (label, target) in [("prev", bounds.prev), ("next", bounds.next)] {
        if let Some(ep) = target.and_then(|i| screen.episodes().get(i)) {
            let _ = writeln!(out, "  {label}: <{}>", routes::episode_path(screen.anime_id(), ep.number.as_str()));
        }
    }

    if let Some(body) = status_body(screen.phase()) {
        out.push_str(&body);
        return out;
    }

    if let Some(ep) = screen.current_episode() {
        if let Some(title) = &ep.title {
            let _ = writeln!(out, "\n{title}");
        }
        if let Some(date) = ep.release_date() {
            let _ = writeln!(out, "Released: {date}");
        }
        if let Some(desc) = &ep.description {
            let _ = writeln!(out, "\n{desc}");
        }
    }
    if let Some(stream) = screen.selected_stream() {
        let kind = if stream.is_m3u8 == Some(true) { " (hls)" } else { "" };
        let _ = writeln!(out, "\nPlay: {}{kind}", stream.url);
    }
    let _ = writeln!(out, "[d] Download Episode");
    let _ = writeln!(
        out,
        "{} Episode List <{}>",
        screen.title(),
        routes::episode_list_path(screen.anime_id())
    );
    let _ = writeln!(out, "Back to anime details <{}>", routes::anime_path(screen.anime_id()));
    out
}

pub fn render_reader<A: ContentApi + ?Sized>(reader: &MangaReader<A>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", reader.title());
    if let Some(ch) = reader.current_chapter() {
        let _ = writeln!(
            out,
            "Ch. {}: {}",
            ch.chapter_number.as_deref().unwrap_or("?"),
            ch.title.as_deref().unwrap_or("")
        );
    }

    if let Some(body) = status_body(reader.phase()) {
        out.push_str(&body);
    } else {
        for page in reader.proxied_pages() {
            let _ = writeln!(out, "  page {:>3}  {}", page.index + 1, page.url);
        }
    }
    let bounds = reader.bounds();
    out.push_str(&nav_bar(bounds, "<", ">"));
    for (label, target) in [("prev", bounds.prev), ("next", bounds.next)] {
        if let Some(ch) = target.and_then(|i| reader.chapters().get(i)) {
            let _ = writeln!(out, "  {label}: <{}>", routes::reader_path(reader.manga_id(), &ch.id));
        }
    }
    out
}

// Loading / error / unresolved body, or `None` when content should be shown.
fn status_body(phase: &Phase) -> Option<String> {
    match phase {
        Phase::Idle | Phase::LoadingParent | Phase::ParentLoaded | Phase::LoadingContent => {
            Some("\nLoading...\n".to_string())
        }
        Phase::Failed(msg) => Some(format!("\nError: {msg}\n")),
        Phase::Unresolved { requested } => Some(format!("\n{requested:?} is not in the list\n")),
        Phase::ContentLoaded => None,
    }
}

// Hidden controls render as blank space so the remaining one keeps its side.
fn nav_bar(bounds: Bounds, prev: &str, next: &str) -> String {
    let left = if bounds.prev.is_some() { format!("[p] {prev}") } else { String::new() };
    let right = if bounds.next.is_some() { format!("{next} [n]") } else { String::new() };
    if left.is_empty() && right.is_empty() {
        return String::new();
    }
    format!("{left:<20}{right:>20}\n")
}
