//! Command line argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Media Kiosk - plays the next unwatched item from a removable drive
#[derive(Parser, Debug)]
#[command(name = "media-kiosk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip preflight checks
    #[arg(long, global = true)]
    pub skip_preflight: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the playback appliance loop
    Run {
        /// Use this media root instead of searching for a drive
        #[arg(long, value_name = "PATH")]
        media_root: Option<PathBuf>,
    },

    /// Scan a media root and update its catalog
    Scan {
        /// Media root containing the movies and shows directories
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Discard existing watch state
        #[arg(long)]
        rebuild: bool,
    },

    /// Show catalog counts and what plays next
    Status {
        /// Media root holding the catalog
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },

    /// Mark a catalog item as seen or unseen
    Mark {
        /// Media root holding the catalog
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Catalog path of the item, e.g. "Movies/Heat (1995)/heat.mkv"
        #[arg(value_name = "FILE_PATH")]
        file_path: String,

        /// Mark as seen
        #[arg(long, conflicts_with = "unseen", required_unless_present = "unseen")]
        seen: bool,

        /// Mark as unseen
        #[arg(long)]
        unseen: bool,
    },
}
