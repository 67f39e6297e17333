//! In-memory cursor store for testing

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{CursorStore, OrgCursor};
use crate::error::StateError;

/// Cursor store backed by a map, with switchable write failures
#[derive(Default)]
pub struct MemoryCursorStore {
    cursors: Mutex<HashMap<String, OrgCursor>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cursor(self, key: &str, cursor: OrgCursor) -> Self {
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.insert(key.to_string(), cursor);
        }
        self
    }

    /// Make every subsequent save fail
    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Number of save calls, failed ones included
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<OrgCursor> {
        self.cursors.lock().ok()?.get(key).copied()
    }
}

impl CursorStore for MemoryCursorStore {
    fn load(&self, key: &str) -> Result<Option<OrgCursor>, StateError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, cursor: &OrgCursor) -> Result<(), StateError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StateError::Io("disk full".to_string()));
        }
        self.cursors
            .lock()
            .map_err(|e| StateError::Io(e.to_string()))?
            .insert(key.to_string(), *cursor);
        Ok(())
    }
}
