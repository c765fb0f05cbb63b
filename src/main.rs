mod cli;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use cli::{Cli, Commands};
use weebixx::config::Config;
use weebixx::routes::Route;
use weebixx::{download, shell, view, Weebixx};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weebixx=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let app = Weebixx::new(config)?;

    match cli.command {
        Commands::Watch { anime_id, episode, quality, download, interactive } => {
            watch(&app, &anime_id, &episode, quality.as_deref(), download, interactive).await
        }
        Commands::Read { manga_id, chapter_id, cbz, interactive } => {
            read(&app, &manga_id, &chapter_id, cbz, interactive).await
        }
        Commands::Open { route, interactive } => match Route::parse(&route) {
            Some(Route::Episode { anime_id, episode_number }) => {
                watch(&app, &anime_id, &episode_number, None, false, interactive).await
            }
            Some(Route::MangaReader { manga_id, chapter_id }) => {
                read(&app, &manga_id, &chapter_id, None, interactive).await
            }
            None => bail!("unknown route: {route}"),
        },
    }
}

async fn watch(
    app: &Weebixx,
    anime_id: &str,
    episode: &str,
    quality: Option<&str>,
    download: bool,
    interactive: bool,
) -> Result<()> {
    let mut screen = app.episode_screen(anime_id, episode);
    screen.mount().await;
    if let Some(q) = quality {
        if !screen.select_quality(q) {
            tracing::warn!(quality = q, "quality not offered; keeping default");
        }
    }
    if interactive {
        return shell::run_episode(&mut screen, app.downloader()).await;
    }
    println!("{}", view::render_episode(&screen));
    if download {
        match screen.download(app.downloader()).await? {
            Some(path) => println!("saved {}", path.display()),
            None => println!("nothing to download"),
        }
    }
    Ok(())
}

async fn read(
    app: &Weebixx,
    manga_id: &str,
    chapter_id: &str,
    cbz: Option<PathBuf>,
    interactive: bool,
) -> Result<()> {
    let mut layout = app.metadata();
    let mut reader = app.manga_reader(manga_id, chapter_id);
    reader.mount().await;
    if interactive {
        let dir = app.config().resolved_download_dir();
        return shell::run_reader(&mut reader, &mut layout, app.client().http(), &dir).await;
    }
    shell::render_reader_with_layout(&reader, &mut layout);
    if let Some(out) = cbz {
        let wrote = download::download_chapter_cbz(app.client().http(), &reader.proxied_pages(), &out, false).await?;
        println!("{} {}", if wrote { "saved" } else { "skipped" }, out.display());
    }
    Ok(())
}
