//! SQLite-backed cursor storage

use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::{CursorStore, OrgCursor};
use crate::LOG_TARGET;
use crate::error::StateError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

const DB_FILE: &str = "state.db";

type Result<T> = std::result::Result<T, StateError>;

/// SQLite cursor store, one row per organization
pub struct SqliteCursorStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteCursorStore {
    /// Open or create the store inside `state_dir`
    pub fn open_at(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)
            .map_err(|e| StateError::Io(format!("Failed to create state dir: {}", e)))?;

        let db_path = state_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                target: LOG_TARGET,
                "State schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| StateError::Io(format!("Failed to remove state DB: {}", e)))?;
            return Self::open_at(state_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cursors (
                state_key TEXT PRIMARY KEY NOT NULL,
                last_window_end INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl CursorStore for SqliteCursorStore {
    fn load(&self, key: &str) -> Result<Option<OrgCursor>> {
        let row: Option<(i64, i64)> = self
            .conn
            .query_row(
                "SELECT last_window_end, updated_at FROM cursors WHERE state_key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((end, updated)) = row else {
            return Ok(None);
        };

        match (
            DateTime::from_timestamp(end, 0),
            DateTime::from_timestamp(updated, 0),
        ) {
            (Some(last_window_end), Some(updated_at)) => Ok(Some(OrgCursor {
                last_window_end,
                updated_at,
            })),
            _ => {
                log::warn!(target: LOG_TARGET, "Discarding out-of-range cursor for '{}'", key);
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, cursor: &OrgCursor) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cursors (state_key, last_window_end, updated_at)
             VALUES (?1, ?2, ?3)",
            params![
                key,
                cursor.last_window_end.timestamp(),
                cursor.updated_at.timestamp()
            ],
        )?;
        Ok(())
    }
}
