//! Command-line interface for touchline.

use clap::{Parser, Subcommand};

/// Touchline - tactical-board match-session engine
#[derive(Parser, Debug)]
#[command(name = "touchline")]
#[command(about = "Tactical soccer-board match sessions with image export", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scripted demonstration match and export the record
    Demo {
        /// Directory the exported match record is written into
        #[arg(short, long, default_value = ".")]
        out_dir: std::path::PathBuf,

        /// Player names for the roster
        #[arg(short, long, value_delimiter = ',', default_value = "Aoi,Ken,Rin")]
        players: Vec<String>,

        /// Ally team name
        #[arg(long, default_value = "味方チーム")]
        ally: String,

        /// Opponent team name
        #[arg(long, default_value = "相手チーム")]
        opponent: String,
    },

    /// Encode player names as a shareable query string
    Share {
        /// Player names to encode
        #[arg(value_delimiter = ',')]
        players: Vec<String>,
    },

    /// Decode a shareable query string back into player names
    Roster {
        /// Query string as produced by `share` (without the leading `?`)
        query: String,
    },
}
