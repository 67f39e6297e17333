//! Introspection dump of the active module configuration
//!
//! Renders the settings back in the same shape they are read in. Optional
//! fields are emitted only when populated.

use serde::Serialize;

use super::{EventType, GithubConfig, OrgCredential};

#[derive(Serialize)]
struct Dump<'a> {
    github: DumpBody<'a>,
}

#[derive(Serialize)]
struct DumpBody<'a> {
    enabled: &'static str,
    run_on_start: &'static str,
    only_future_events: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_delay: Option<u64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    api_auth: &'a [OrgCredential],
    #[serde(skip_serializing_if = "Option::is_none")]
    event_type: Option<EventType>,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Render the configuration as a compact JSON document.
pub fn dump(config: &GithubConfig) -> serde_json::Result<String> {
    let body = DumpBody {
        enabled: yes_no(config.enabled),
        run_on_start: yes_no(config.run_on_start),
        only_future_events: yes_no(config.only_future_events),
        interval: config.interval.filter(|v| *v > 0),
        time_delay: config.time_delay.filter(|v| *v > 0),
        api_auth: &config.organizations,
        event_type: config.event_type,
    };
    serde_json::to_string(&Dump { github: body })
}
