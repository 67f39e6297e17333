//! Per-organization scan cursors
//!
//! A cursor is the end of the last queried time window. It is keyed by
//! `<module>-<org_name>` and survives process restarts.

use chrono::{DateTime, Utc};

use crate::config::MODULE_NAME;
use crate::error::StateError;

#[cfg(test)]
pub mod mock;
pub mod storage;

#[cfg(test)]
pub use mock::MemoryCursorStore;
pub use storage::SqliteCursorStore;

/// Persisted watermark for one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgCursor {
    pub last_window_end: DateTime<Utc>,
    /// When the cursor was last written
    pub updated_at: DateTime<Utc>,
}

impl OrgCursor {
    pub fn new(last_window_end: DateTime<Utc>) -> Self {
        Self {
            last_window_end,
            updated_at: Utc::now(),
        }
    }
}

/// State key of an organization
pub fn state_key(org_name: &str) -> String {
    format!("{}-{}", MODULE_NAME, org_name)
}

/// Cursor persistence
pub trait CursorStore: Send {
    fn load(&self, key: &str) -> Result<Option<OrgCursor>, StateError>;

    /// Overwrite the cursor stored under `key`
    fn save(&self, key: &str, cursor: &OrgCursor) -> Result<(), StateError>;
}
