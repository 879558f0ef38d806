//! Command-line interface for aivault.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AI Vault - escape-room puzzles about how AI works
#[derive(Parser, Debug)]
#[command(name = "aivault")]
#[command(about = "Escape-room puzzle game with an AI assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play in the console
    Play {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "config/aivault.toml")]
        config: PathBuf,

        /// Override the puzzle catalog location
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Override the save file location
        #[arg(long)]
        save: Option<PathBuf>,

        /// Discard any save and start over
        #[arg(long)]
        new: bool,
    },

    /// Validate a puzzle catalog and report problems
    CheckCatalog {
        /// Catalog file to check
        path: PathBuf,
    },

    /// Print the progress stored in a save file
    Status {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "config/aivault.toml")]
        config: PathBuf,

        /// Override the save file location
        #[arg(long)]
        save: Option<PathBuf>,
    },
}
