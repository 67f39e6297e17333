//! Internal message bus
//!
//! Everything the collector emits (ingested events and health alerts) goes
//! through [`EventForwarder`] onto a [`MessageQueue`], paced by one shared
//! [`SendThrottle`].

use async_trait::async_trait;

use crate::error::QueueError;

pub mod forwarder;
#[cfg(test)]
pub mod mock;
pub mod throttle;

pub use forwarder::EventForwarder;
#[cfg(test)]
pub use mock::RecordingQueue;
pub use throttle::SendThrottle;

/// Queue type tag for messages originating from a local source
pub const LOCALFILE_MQ: char = '1';

/// Frame a message the way the bus expects it: `<type>:<location>:<message>`
pub fn frame(location: &str, message: &str) -> String {
    format!("{}:{}:{}", LOCALFILE_MQ, location, message)
}

/// Outbound side of the internal bus
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Deliver one message tagged with a symbolic location.
    async fn send(&self, location: &str, message: &str) -> Result<(), QueueError>;

    /// Human-readable destination, used in error logs
    fn destination(&self) -> String;
}

#[cfg(unix)]
pub use unix::UnixQueue;

#[cfg(unix)]
mod unix {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use tokio::net::UnixDatagram;

    use super::{MessageQueue, frame};
    use crate::error::QueueError;

    /// Datagram socket connection to the local bus
    pub struct UnixQueue {
        socket: UnixDatagram,
        path: PathBuf,
    }

    impl UnixQueue {
        /// Connect to the bus socket. Must be called inside a tokio runtime.
        pub fn connect(path: &Path) -> Result<Self, QueueError> {
            let connect_err = |e: std::io::Error| QueueError::Connect {
                path: path.display().to_string(),
                reason: e.to_string(),
            };

            let socket = UnixDatagram::unbound().map_err(connect_err)?;
            socket.connect(path).map_err(connect_err)?;

            Ok(Self {
                socket,
                path: path.to_path_buf(),
            })
        }
    }

    #[async_trait]
    impl MessageQueue for UnixQueue {
        async fn send(&self, location: &str, message: &str) -> Result<(), QueueError> {
            let framed = frame(location, message);
            self.socket
                .send(framed.as_bytes())
                .await
                .map(|_| ())
                .map_err(|e| QueueError::Send {
                    path: self.destination(),
                    reason: e.to_string(),
                })
        }

        fn destination(&self) -> String {
            self.path.display().to_string()
        }
    }

}
