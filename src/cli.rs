use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "playmark",
    version,
    about = "Play media files with an external player, resuming where you left off"
)]
pub struct Cli {
    /// Bookmark database to use instead of the per-user default.
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a file, using its bookmark if it is still valid.
    Play {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List all known bookmarks.
    List {
        /// Print the bookmarks as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove all bookmarks.
    Clear,
    /// Remove bookmarks that have expired.
    Expire,
    /// Display or change settings.
    Config {
        /// Setting to display or change.
        name: Option<String>,
        /// New value for the setting.
        #[arg(requires = "name")]
        value: Option<String>,
    },
}
