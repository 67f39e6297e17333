//! Event and alert publishing
//!
//! Every outbound message is wrapped in the fixed envelope
//! `{"github": {"actor": "wazuh", "source": "github", "organization": ..., ...}}`
//! and paced through the shared [`SendThrottle`].

use std::sync::Arc;

use log::debug;
use serde_json::{Map, Value, json};

use super::{MessageQueue, SendThrottle};
use crate::LOG_TARGET;
use crate::config::MODULE_NAME;
use crate::error::QueueError;

/// Value of the envelope `actor` field
pub const ENVELOPE_ACTOR: &str = "wazuh";

/// Value of the envelope `source` field
pub const ENVELOPE_SOURCE: &str = "github";

/// Alert text used when a failure carries no message
pub const UNKNOWN_ERROR: &str = "Unknown error";

fn envelope_fields(organization: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("actor".to_string(), json!(ENVELOPE_ACTOR));
    fields.insert("source".to_string(), json!(ENVELOPE_SOURCE));
    fields.insert("organization".to_string(), json!(organization));
    fields
}

fn wrap(fields: Map<String, Value>) -> Value {
    let mut root = Map::new();
    root.insert(MODULE_NAME.to_string(), Value::Object(fields));
    Value::Object(root)
}

/// Wrap one raw event. Raw fields follow the envelope fields and take
/// precedence on name clashes; non-object events go under `event`.
pub fn event_envelope(organization: &str, event: Value) -> Value {
    let mut fields = envelope_fields(organization);
    match event {
        Value::Object(raw) => fields.extend(raw),
        other => {
            fields.insert("event".to_string(), other);
        }
    }
    wrap(fields)
}

/// Build the health alert for an organization.
///
/// A message that is itself a JSON document (API error bodies are) is
/// embedded as JSON.
pub fn alert_envelope(organization: &str, error_message: Option<&str>) -> Value {
    let response = match error_message.map(str::trim) {
        None | Some("") => json!(UNKNOWN_ERROR),
        Some(message) => serde_json::from_str::<Value>(message)
            .ok()
            .filter(|v| v.is_object() || v.is_array())
            .unwrap_or_else(|| json!(message)),
    };

    let mut fields = envelope_fields(organization);
    fields.insert("response".to_string(), response);
    wrap(fields)
}

/// Publishes envelopes onto the bus.
pub struct EventForwarder {
    queue: Arc<dyn MessageQueue>,
    throttle: Arc<SendThrottle>,
}

impl EventForwarder {
    pub fn new(queue: Arc<dyn MessageQueue>, throttle: Arc<SendThrottle>) -> Self {
        Self { queue, throttle }
    }

    /// Forward one ingested event.
    pub async fn forward(&self, organization: &str, event: Value) -> Result<(), QueueError> {
        let message = event_envelope(organization, event).to_string();
        debug!(target: LOG_TARGET, "Sending GitHub log: '{}'", message);
        self.send(&message).await
    }

    /// Emit a health alert for an organization.
    pub async fn send_alert(
        &self,
        organization: &str,
        error_message: Option<&str>,
    ) -> Result<(), QueueError> {
        let message = alert_envelope(organization, error_message).to_string();
        debug!(target: LOG_TARGET, "Sending GitHub internal message: '{}'", message);
        self.send(&message).await
    }

    async fn send(&self, message: &str) -> Result<(), QueueError> {
        self.throttle.wait().await;
        self.queue.send(MODULE_NAME, message).await
    }
}
