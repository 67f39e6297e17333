//! Audit-log API client
//!
//! The executor only sees [`AuditLogApi`]; [`GithubClient`] is the `reqwest`
//! implementation used in production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::{EventType, OrgCredential};
use crate::error::ScanError;

pub mod github;
#[cfg(test)]
pub mod mock;
pub mod pagination;

pub use github::GithubClient;
#[cfg(test)]
pub use mock::MockAuditLogApi;
pub use pagination::{NextLinkParser, pages};

/// Timestamp format used in the `created:` search phrase
pub const PHRASE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One raw HTTP response of a paginated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
    /// Raw `Link` response header, if present
    pub link: Option<String>,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Half-open query window `[start, end)` over event creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Render as the `created:<start>..<end>` search phrase
    pub fn phrase(&self) -> String {
        format!(
            "created:{}..{}",
            self.start.format(PHRASE_TIME_FORMAT),
            self.end.format(PHRASE_TIME_FORMAT)
        )
    }
}

/// Everything needed to build the first request of one organization scan
#[derive(Debug, Clone)]
pub struct AuditQuery<'a> {
    pub org_name: &'a str,
    pub window: TimeWindow,
    pub event_type: EventType,
}

/// Audit-log API operations used by the scan executor
#[async_trait]
pub trait AuditLogApi: Send + Sync {
    /// URL of the first page for a query
    fn audit_log_url(&self, query: &AuditQuery<'_>) -> Result<String, ScanError>;

    /// Fetch one page. Non-2xx statuses are returned as pages, not errors;
    /// only transport failures are errors here.
    async fn get_page(&self, url: &str, credential: &OrgCredential) -> Result<Page, ScanError>;
}
