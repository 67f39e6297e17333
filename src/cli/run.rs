//! Collector commands

use log::{error, info};

use crate::LOG_TARGET;
use crate::config::Settings;
use crate::error::Result;
use crate::scan::{build_executor, connect_queue, run_module};

/// Run the collector loop until Ctrl-C.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    let settings = Settings::load_at(config_path)?;

    run_module(&settings, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: LOG_TARGET, "Interrupt received, stopping");
        } else {
            // Without a signal handler the loop runs until killed
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run exactly one scan cycle.
pub async fn scan(config_path: Option<&str>, initial: bool) -> Result<()> {
    let settings = Settings::load_at(config_path)?;

    if !settings.github.enabled {
        info!(target: LOG_TARGET, "Module GitHub disabled.");
        return Ok(());
    }

    let queue = connect_queue(&settings.queue.path).inspect_err(|_| {
        error!(target: LOG_TARGET, "Can't connect to queue. Closing module.");
    })?;

    let mut executor = build_executor(&settings, queue)?;
    let processed = executor.execute_scan(&settings.github, initial).await;

    info!(target: LOG_TARGET, "Scanned {} organization(s)", processed);
    Ok(())
}
