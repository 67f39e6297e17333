//! ghaudit - GitHub organization audit-log collector
//!
//! Periodically pulls audit-log events for a set of organizations and
//! forwards them, one JSON message per event, onto the local message bus.

use clap::Parser;

mod cli;
mod client;
mod config;
mod error;
mod queue;
mod scan;
mod state;

use cli::{Cli, Commands};
use error::Result;

/// Log target shared by every message this module emits
pub const LOG_TARGET: &str = "github";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run => cli::run::run(config_path).await,
        Commands::Scan { initial } => cli::run::scan(config_path, initial).await,
        Commands::Dump => cli::config::dump(config_path),
        Commands::Check => cli::config::check(config_path),
    }
}
