//! In-memory bus for testing

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::MessageQueue;
use crate::error::QueueError;

/// Records every delivered `(location, message)` pair.
#[derive(Default)]
pub struct RecordingQueue {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose sends always fail
    pub fn failing() -> Self {
        let queue = Self::default();
        queue.failing.store(true, Ordering::SeqCst);
        queue
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// Delivered messages parsed back to JSON
    pub async fn messages(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|(_, m)| serde_json::from_str(m).ok())
            .collect()
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn send(&self, location: &str, message: &str) -> Result<(), QueueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueueError::Send {
                path: self.destination(),
                reason: "Connection refused".to_string(),
            });
        }
        self.sent
            .lock()
            .await
            .push((location.to_string(), message.to_string()));
        Ok(())
    }

    fn destination(&self) -> String {
        "queue/sockets/queue".to_string()
    }
}
