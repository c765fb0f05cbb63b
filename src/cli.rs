use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse anime episodes and manga chapters from a Consumet-style API
#[derive(Parser)]
#[command(name = "weebixx")]
#[command(about = "Watch anime episodes and read manga chapters from the terminal", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show an episode and its streams
    Watch {
        anime_id: String,
        /// Episode number as it appears in the episode list
        episode: String,
        /// Quality to select instead of the first offered
        #[arg(short, long)]
        quality: Option<String>,
        /// Download the selected stream
        #[arg(short, long)]
        download: bool,
        /// Stay open and accept navigation commands
        #[arg(short, long)]
        interactive: bool,
    },
    /// Show a manga chapter's pages
    Read {
        manga_id: String,
        /// Chapter id (percent-encoded ids are decoded)
        chapter_id: String,
        /// Save the chapter as a CBZ archive
        #[arg(long, value_name = "FILE")]
        cbz: Option<PathBuf>,
        /// Stay open and accept navigation commands
        #[arg(short, long)]
        interactive: bool,
    },
    /// Open a route such as /episode/21/1 or /manga-reader/30013/<chapter>
    Open {
        route: String,
        #[arg(short, long)]
        interactive: bool,
    },
}
