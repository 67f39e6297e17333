//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod config;
pub mod run;

/// ghaudit - GitHub audit-log collector
#[derive(Parser, Debug)]
#[command(name = "ghaudit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Override config file location
    #[arg(long, global = true, env = "GHAUDIT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "GHAUDIT_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the collector until interrupted
    Run,

    /// Run a single scan cycle and exit
    Scan {
        /// Treat the cycle as the first one (organizations without a cursor
        /// only get a baseline)
        #[arg(long)]
        initial: bool,
    },

    /// Print the active module configuration as JSON
    Dump,

    /// Validate the configuration file
    Check,
}
