//! Line-driven interactive loop over a mounted screen.

use std::path::Path;

use anyhow::Result;
use reqwest::Client;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::ContentApi;
use crate::download::{self, sanitize_filename, Downloader};
use crate::episode::EpisodeScreen;
use crate::metadata::MetadataReader;
use crate::reader::MangaReader;
use crate::routes::Route;
use crate::view;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Quality(String),
    Download,
    Reload,
    Open(Route),
    Help,
    Exit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((h, a)) => (h, a.trim()),
            None => (line, ""),
        };
        match (head, arg) {
            ("n" | "next", "") => Some(Self::Next),
            ("p" | "prev", "") => Some(Self::Prev),
            ("q" | "quality", q) if !q.is_empty() => Some(Self::Quality(q.to_string())),
            ("d" | "download", "") => Some(Self::Download),
            ("r" | "reload", "") => Some(Self::Reload),
            ("o" | "open", path) => Route::parse(path).map(Self::Open),
            ("h" | "help" | "?", "") => Some(Self::Help),
            ("x" | "exit" | "quit", "") => Some(Self::Exit),
            _ => None,
        }
    }
}

const HELP: &str = "commands: n(ext) p(rev) q <quality> d(ownload) r(eload) o <route> x(exit)";

pub async fn run_episode<A, D>(screen: &mut EpisodeScreen<A>, downloader: &D) -> Result<()>
where
    A: ContentApi + ?Sized,
    D: Downloader + ?Sized,
{
    println!("{}", view::render_episode(screen));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(cmd) = Command::parse(&line) else {
            println!("{HELP}");
            continue;
        };
        match cmd {
            Command::Exit => break,
            Command::Help => println!("{HELP}"),
            Command::Next => {
                screen.next().await;
            }
            Command::Prev => {
                screen.prev().await;
            }
            Command::Reload => screen.load_streams().await,
            Command::Quality(q) => {
                if !screen.select_quality(&q) {
                    println!("no {q} stream for this episode");
                }
            }
            Command::Download => match screen.download(downloader).await {
                Ok(Some(path)) => println!("saved {}", path.display()),
                Ok(None) => println!("nothing to download"),
                Err(e) => println!("download failed: {e:#}"),
            },
            Command::Open(Route::Episode { anime_id, episode_number }) => {
                screen.open(&anime_id, &episode_number).await;
            }
            Command::Open(route) => println!("{} is not an episode route", route.path()),
        }
        println!("{}", view::render_episode(screen));
    }
    Ok(())
}

pub async fn run_reader<A>(
    reader: &mut MangaReader<A>,
    layout: &mut MetadataReader,
    http: &Client,
    download_dir: &Path,
) -> Result<()>
where
    A: ContentApi + ?Sized,
{
    render_reader_with_layout(reader, layout);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(cmd) = Command::parse(&line) else {
            println!("{HELP}");
            continue;
        };
        match cmd {
            Command::Exit => break,
            Command::Help => println!("{HELP}"),
            Command::Next => {
                reader.next().await;
            }
            Command::Prev => {
                reader.prev().await;
            }
            Command::Reload => reader.load_pages().await,
            Command::Quality(_) => println!("chapters have no quality setting"),
            Command::Download => {
                let out = download_dir.join(cbz_name(reader));
                match download::download_chapter_cbz(http, &reader.proxied_pages(), &out, false).await {
                    Ok(true) => println!("saved {}", out.display()),
                    Ok(false) => println!("skipped {}", out.display()),
                    Err(e) => println!("download failed: {e:#}"),
                }
            }
            Command::Open(Route::MangaReader { manga_id, chapter_id }) => {
                reader.open(&manga_id, &chapter_id).await;
            }
            Command::Open(route) => println!("{} is not a reader route", route.path()),
        }
        render_reader_with_layout(reader, layout);
    }
    Ok(())
}

pub fn render_reader_with_layout<A: ContentApi + ?Sized>(reader: &MangaReader<A>, layout: &mut MetadataReader) {
    let meta = layout.current_if_changed().unwrap_or_else(|| layout.current());
    print!("{}", view::render_layout_header(&meta));
    println!("{}", view::render_reader(reader));
}

/// `<title>_chapter_<n>.cbz`
pub fn cbz_name<A: ContentApi + ?Sized>(reader: &MangaReader<A>) -> String {
    let number = reader
        .current_chapter()
        .and_then(|c| c.chapter_number.clone())
        .unwrap_or_else(|| reader.index().map(|i| (i + 1).to_string()).unwrap_or_default());
    format!("{}.cbz", sanitize_filename(&format!("{}_chapter_{}", reader.title(), number)))
}
