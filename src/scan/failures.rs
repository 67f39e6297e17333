//! Per-organization failure tracking and alert escalation
//!
//! Each organization gets a consecutive-failure counter. The first two
//! failures are only logged; from the third on, every failure also emits a
//! health alert onto the bus. A successful scan resets the counter.

use log::{debug, error};

use crate::LOG_TARGET;
use crate::queue::EventForwarder;

/// Failures tolerated (pre-increment count) before alerts are emitted
pub const ESCALATION_THRESHOLD: u32 = 2;

/// Failure counter of one organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub org_name: String,
    pub consecutive_failures: u32,
}

/// What a recorded failure led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// No record existed; one was created and counted
    FirstFailure,
    /// Counted, still within the grace period
    Counted,
    /// Counted and an alert was sent
    Escalated,
    /// Counted; the alert could not be delivered
    AlertFailed,
}

/// Failure records in first-seen order. Lives as long as the process.
#[derive(Debug, Default)]
pub struct FailureRegistry {
    records: Vec<FailureRecord>,
}

impl FailureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    #[cfg(test)]
    pub fn get(&self, org_name: &str) -> Option<&FailureRecord> {
        self.records.iter().find(|r| r.org_name == org_name)
    }

    /// Current consecutive failures of an organization (0 if unknown)
    #[cfg(test)]
    pub fn failures_of(&self, org_name: &str) -> u32 {
        self.get(org_name).map_or(0, |r| r.consecutive_failures)
    }

    fn position(&self, org_name: &str) -> Option<usize> {
        let found = self.records.iter().position(|r| r.org_name == org_name);
        if found.is_none() {
            debug!(target: LOG_TARGET, "No record for this organization: '{}'", org_name);
        }
        found
    }

    /// Record one failed scan and escalate if the organization is past the
    /// grace period.
    pub async fn record_failure(
        &mut self,
        org_name: &str,
        error_message: Option<&str>,
        sink: &EventForwarder,
    ) -> FailureOutcome {
        let (index, is_new) = match self.position(org_name) {
            Some(index) => (index, false),
            None => {
                self.records.push(FailureRecord {
                    org_name: org_name.to_string(),
                    consecutive_failures: 0,
                });
                (self.records.len() - 1, true)
            }
        };

        let previous = self.records[index].consecutive_failures;
        let outcome = if previous >= ESCALATION_THRESHOLD {
            match sink.send_alert(org_name, error_message).await {
                Ok(()) => FailureOutcome::Escalated,
                Err(e) => {
                    error!(target: LOG_TARGET, "{}", e);
                    FailureOutcome::AlertFailed
                }
            }
        } else if is_new {
            FailureOutcome::FirstFailure
        } else {
            FailureOutcome::Counted
        };

        self.records[index].consecutive_failures = previous.saturating_add(1);
        outcome
    }

    /// Reset the counter after a successful scan. Returns whether a record
    /// existed.
    pub fn record_success(&mut self, org_name: &str) -> bool {
        match self.position(org_name) {
            Some(index) => {
                self.records[index].consecutive_failures = 0;
                true
            }
            None => false,
        }
    }
}
