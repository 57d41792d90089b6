//! CLI interface for adaptive-sizing
//!
//! Provides subcommands for:
//! - `replay`: Stream recorded ticks through a meta controller
//! - `config`: Show the effective configuration

mod replay;

pub use replay::{replay, ReplayArgs, ReplaySummary, TickRecord};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "adaptive-sizing")]
#[command(about = "Adaptive position sizing and portfolio control")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay JSON-lines ticks and print one controller output per line
    Replay(ReplayArgs),
    /// Show the effective configuration as TOML
    Config,
}
