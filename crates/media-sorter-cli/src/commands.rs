use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-sorter")]
#[command(about = "Sort photos and videos into a library, deleting exact duplicates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move new media from the source tree into the destination and delete duplicates
    Process(PathArgs),
    /// Hash a file and report whether the index already holds its content
    Check {
        file: PathBuf,
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Display the number of entries and total size held by the index
    IndexStats(PathArgs),
    /// Print configuration values
    PrintConfig(PathArgs),
}

/// Overrides for the paths otherwise read from Config.toml or MEDIA_SORTER_* variables.
#[derive(Debug, Default, Args)]
pub struct PathArgs {
    /// Source directory to empty
    #[arg(long)]
    pub source: Option<String>,
    /// Destination library root
    #[arg(long)]
    pub destination: Option<String>,
    /// Path of the SQLite hash index
    #[arg(long)]
    pub index: Option<String>,
}

impl PathArgs {
    pub fn overrides(&self) -> media_sorter_core::config::ConfigOverrides {
        media_sorter_core::config::ConfigOverrides {
            source_dir: self.source.clone(),
            destination_dir: self.destination.clone(),
            index_path: self.index.clone(),
        }
    }
}
