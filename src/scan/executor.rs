//! One scan cycle across all configured organizations
//!
//! Per organization: load the cursor, close the window at `now - time_delay`,
//! persist the new cursor before fetching, walk every page and forward each
//! event. Errors are isolated per organization and end up in the
//! [`FailureRegistry`]; they never abort the cycle.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::TryStreamExt;
use log::{debug, error, warn};
use serde_json::Value;

use super::failures::FailureRegistry;
use crate::LOG_TARGET;
use crate::client::{AuditLogApi, AuditQuery, NextLinkParser, TimeWindow, pages};
use crate::config::{GithubConfig, OrgCredential};
use crate::error::ScanError;
use crate::queue::EventForwarder;
use crate::state::{CursorStore, OrgCursor, state_key};

/// Result of scanning one organization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgScanOutcome {
    /// First cycle without a cursor: baseline stored, nothing fetched
    Baseline,
    /// Window was empty, nothing to fetch
    Idle,
    /// Pages fetched; number of events handed to the bus
    Fetched(usize),
    /// The scan failed and was recorded as a failure
    Failed,
}

/// Drives scans for every organization of a module configuration.
pub struct ScanExecutor<S: CursorStore> {
    api: Arc<dyn AuditLogApi>,
    store: S,
    forwarder: EventForwarder,
    failures: FailureRegistry,
    links: NextLinkParser,
}

impl<S: CursorStore> ScanExecutor<S> {
    pub fn new(api: Arc<dyn AuditLogApi>, store: S, forwarder: EventForwarder) -> Self {
        Self {
            api,
            store,
            forwarder,
            failures: FailureRegistry::new(),
            links: NextLinkParser::new(),
        }
    }

    #[cfg(test)]
    pub fn failures(&self) -> &FailureRegistry {
        &self.failures
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scan every organization in configuration order.
    ///
    /// Returns the number of organizations processed.
    pub async fn execute_scan(&mut self, config: &GithubConfig, initial_scan: bool) -> usize {
        for credential in &config.organizations {
            self.scan_organization(config, credential, initial_scan).await;
        }
        config.organizations.len()
    }

    /// Scan one organization.
    pub async fn scan_organization(
        &mut self,
        config: &GithubConfig,
        credential: &OrgCredential,
        initial_scan: bool,
    ) -> OrgScanOutcome {
        let org_name = credential.org_name.as_str();
        debug!(target: LOG_TARGET, "Scanning organization: '{}'", org_name);

        let key = state_key(org_name);
        let previous = match self.store.load(&key) {
            Ok(cursor) => cursor,
            Err(e) => {
                warn!(target: LOG_TARGET, "Couldn't load running state: {}", e);
                None
            }
        };

        let now = Utc::now();
        let window = TimeWindow {
            start: window_start(previous.as_ref(), config.only_future_events, now),
            end: window_end(now, config.time_delay_secs()),
        };

        self.establish_baseline(&key, window.end);

        if initial_scan && previous.is_none() {
            debug!(
                target: LOG_TARGET,
                "Bookmark set to '{}' for organization '{}', first fetch skipped.",
                window.end,
                org_name
            );
            self.commit_result(&key, window.end);
            self.failures.record_success(org_name);
            return OrgScanOutcome::Baseline;
        }

        if window.start >= window.end {
            debug!(target: LOG_TARGET, "Empty window for organization '{}'", org_name);
            self.commit_result(&key, window.end);
            self.failures.record_success(org_name);
            return OrgScanOutcome::Idle;
        }

        let query = AuditQuery {
            org_name,
            window,
            event_type: config.event_type(),
        };

        match self.fetch_and_forward(credential, &query).await {
            Ok(forwarded) => {
                debug!(
                    target: LOG_TARGET,
                    "Organization '{}': {} events forwarded",
                    org_name,
                    forwarded
                );
                self.commit_result(&key, window.end);
                self.failures.record_success(org_name);
                OrgScanOutcome::Fetched(forwarded)
            }
            Err(e) => {
                debug!(target: LOG_TARGET, "Scan of '{}' failed: {}", org_name, e);
                let message = e.failure_message();
                self.failures
                    .record_failure(org_name, message.as_deref(), &self.forwarder)
                    .await;
                OrgScanOutcome::Failed
            }
        }
    }

    /// Persist the window end before any network call, so a crash mid-fetch
    /// still moves the cursor forward.
    pub fn establish_baseline(&self, key: &str, window_end: DateTime<Utc>) -> bool {
        self.persist(key, window_end)
    }

    /// Persist the window end once its events have been handled.
    pub fn commit_result(&self, key: &str, window_end: DateTime<Utc>) -> bool {
        self.persist(key, window_end)
    }

    fn persist(&self, key: &str, window_end: DateTime<Utc>) -> bool {
        match self.store.save(key, &OrgCursor::new(window_end)) {
            Ok(()) => true,
            Err(e) => {
                error!(target: LOG_TARGET, "Couldn't save running state.");
                debug!(target: LOG_TARGET, "State error for '{}': {}", key, e);
                false
            }
        }
    }

    async fn fetch_and_forward(
        &self,
        credential: &OrgCredential,
        query: &AuditQuery<'_>,
    ) -> Result<usize, ScanError> {
        let url = self.api.audit_log_url(query)?;
        debug!(target: LOG_TARGET, "GitHub API URL: '{}'", url);

        let pages = pages(self.api.as_ref(), credential, &self.links, url);
        futures::pin_mut!(pages);

        let mut forwarded = 0;
        while let Some(page) = pages.try_next().await? {
            if !page.is_success() {
                return Err(ScanError::HttpStatus {
                    status: page.status,
                    body: page.body,
                });
            }

            let events: Vec<Value> = serde_json::from_str(&page.body).map_err(|e| {
                debug!(target: LOG_TARGET, "Error parsing response body.");
                ScanError::Parse(e.to_string())
            })?;

            for event in events {
                match self.forwarder.forward(query.org_name, event).await {
                    Ok(()) => forwarded += 1,
                    Err(e) => error!(target: LOG_TARGET, "{}", e),
                }
            }
        }

        Ok(forwarded)
    }
}

/// End of the window: `now - time_delay`, clamped to the earliest
/// representable instant.
fn window_end(now: DateTime<Utc>, time_delay_secs: u64) -> DateTime<Utc> {
    i64::try_from(time_delay_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delay| now.checked_sub_signed(delay))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Start of the next window: the stored cursor, or a default bound when the
/// organization has never been scanned.
fn window_start(
    previous: Option<&OrgCursor>,
    only_future_events: bool,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match previous {
        Some(cursor) => cursor.last_window_end,
        None if only_future_events => now,
        None => DateTime::UNIX_EPOCH,
    }
}
