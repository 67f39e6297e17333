//! Module lifecycle and the cycle loop

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use super::executor::ScanExecutor;
use crate::LOG_TARGET;
use crate::client::GithubClient;
use crate::config::{GithubConfig, Settings};
use crate::error::{QueueError, Result};
use crate::queue::{EventForwarder, MessageQueue, SendThrottle};
use crate::state::{CursorStore, SqliteCursorStore};

/// Runs scan cycles every `interval` seconds.
///
/// Only the first cycle is an initial scan. Shutdown is observed between
/// cycles, never in the middle of one.
pub struct Scheduler<S: CursorStore> {
    config: GithubConfig,
    executor: ScanExecutor<S>,
    cycles: u64,
}

impl<S: CursorStore> Scheduler<S> {
    pub fn new(config: GithubConfig, executor: ScanExecutor<S>) -> Self {
        Self {
            config,
            executor,
            cycles: 0,
        }
    }

    /// Number of completed cycles
    #[cfg(test)]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    #[cfg(test)]
    pub fn executor(&self) -> &ScanExecutor<S> {
        &self.executor
    }

    /// Run one cycle over every organization.
    pub async fn run_cycle(&mut self) -> usize {
        let initial_scan = self.cycles == 0;
        debug!(
            target: LOG_TARGET,
            "Starting scan cycle {} (initial: {})",
            self.cycles + 1,
            initial_scan
        );
        let processed = self.executor.execute_scan(&self.config, initial_scan).await;
        self.cycles += 1;
        processed
    }

    /// Loop until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let interval = Duration::from_secs(self.config.interval_secs());

        if !self.config.run_on_start && pause(interval, shutdown.as_mut()).await {
            return;
        }

        loop {
            self.run_cycle().await;
            if pause(interval, shutdown.as_mut()).await {
                return;
            }
        }
    }
}

/// Sleep one interval. Returns true if shutdown fired first.
async fn pause<F>(interval: Duration, shutdown: Pin<&mut F>) -> bool
where
    F: Future<Output = ()>,
{
    debug!(target: LOG_TARGET, "Sleeping {:?} until next scan", interval);
    tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        _ = shutdown => true,
    }
}

/// Open the internal bus socket.
#[cfg(unix)]
pub fn connect_queue(path: &Path) -> std::result::Result<Arc<dyn MessageQueue>, QueueError> {
    let queue = crate::queue::UnixQueue::connect(path)?;
    Ok(Arc::new(queue))
}

#[cfg(not(unix))]
pub fn connect_queue(path: &Path) -> std::result::Result<Arc<dyn MessageQueue>, QueueError> {
    Err(QueueError::Connect {
        path: path.display().to_string(),
        reason: "Unix datagram sockets are not supported on this platform".to_string(),
    })
}

/// Wire the production collaborators around an already connected bus.
pub fn build_executor(
    settings: &Settings,
    queue: Arc<dyn MessageQueue>,
) -> Result<ScanExecutor<SqliteCursorStore>> {
    let api = GithubClient::new(settings.api.base_url.clone(), settings.api.page_size)?;
    let store = SqliteCursorStore::open_at(&settings.state.dir)?;
    debug!(target: LOG_TARGET, "Cursor store: {}", store.db_path().display());

    let throttle = Arc::new(SendThrottle::per_second(settings.queue.max_eps));
    let forwarder = EventForwarder::new(queue, throttle);

    Ok(ScanExecutor::new(Arc::new(api), store, forwarder))
}

/// Full module lifecycle: skip when disabled, connect to the bus, then loop
/// until `shutdown` resolves.
///
/// A bus connection failure is the only fatal error.
pub async fn run_module<F>(settings: &Settings, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    if !settings.github.enabled {
        info!(target: LOG_TARGET, "Module GitHub disabled.");
        return Ok(());
    }

    info!(target: LOG_TARGET, "Module GitHub started.");

    let queue = match connect_queue(&settings.queue.path) {
        Ok(queue) => queue,
        Err(e) => {
            error!(target: LOG_TARGET, "Can't connect to queue. Closing module.");
            return Err(e.into());
        }
    };

    let executor = build_executor(settings, queue)?;
    let mut scheduler = Scheduler::new(settings.github.clone(), executor);
    scheduler.run_until(shutdown).await;

    info!(target: LOG_TARGET, "Module GitHub finished.");
    Ok(())
}
