//! Configuration management for the collector
//!
//! The `github` block is validated tag by tag so that every rejection names
//! the offending tag. The ambient sections (`queue`, `state`, `api`) are plain
//! serde structs with defaults.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub mod dump;

pub use dump::dump;

/// Module name, used as bus location and state key prefix
pub const MODULE_NAME: &str = "github";

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "/var/ossec/etc/ghaudit.yaml";

/// Default scan interval (10 minutes)
pub const DEFAULT_INTERVAL: u64 = 600;

/// Default publication delay compensation
pub const DEFAULT_TIME_DELAY: u64 = 1;

/// Environment override for the API base URL
pub const API_URL_ENV: &str = "GHAUDIT_API_URL";

const TAG_ENABLED: &str = "enabled";
const TAG_RUN_ON_START: &str = "run_on_start";
const TAG_INTERVAL: &str = "interval";
const TAG_TIME_DELAY: &str = "time_delay";
const TAG_ONLY_FUTURE_EVENTS: &str = "only_future_events";
const TAG_API_AUTH: &str = "api_auth";
const TAG_ORG_NAME: &str = "org_name";
const TAG_API_TOKEN: &str = "api_token";
const TAG_API_PARAMETERS: &str = "api_parameters";
const TAG_EVENT_TYPE: &str = "event_type";

/// Audit event families the API can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    All,
    Git,
    Web,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::All => "all",
            EventType::Git => "git",
            EventType::Web => "web",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(EventType::All),
            "git" => Some(EventType::Git),
            "web" => Some(EventType::Web),
            _ => None,
        }
    }
}

/// Credentials for one organization
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct OrgCredential {
    pub org_name: String,
    pub api_token: String,
}

impl OrgCredential {
    pub fn new(org_name: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            api_token: api_token.into(),
        }
    }
}

impl fmt::Debug for OrgCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgCredential")
            .field("org_name", &self.org_name)
            .field("api_token", &"***")
            .finish()
    }
}

/// Settings of the `github` module block.
///
/// `Default` is the unconfigured module: everything off and unset. A loaded
/// configuration starts from [`GithubConfig::module_defaults`] instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GithubConfig {
    pub enabled: bool,
    pub run_on_start: bool,
    pub only_future_events: bool,
    /// Seconds between scan cycles
    pub interval: Option<u64>,
    /// Seconds subtracted from "now" when closing a window
    pub time_delay: Option<u64>,
    pub organizations: Vec<OrgCredential>,
    pub event_type: Option<EventType>,
}

impl GithubConfig {
    /// Values used for tags the user leaves out.
    pub fn module_defaults() -> Self {
        Self {
            enabled: true,
            run_on_start: true,
            only_future_events: true,
            interval: Some(DEFAULT_INTERVAL),
            time_delay: Some(DEFAULT_TIME_DELAY),
            organizations: Vec::new(),
            event_type: Some(EventType::All),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval.filter(|v| *v > 0).unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn time_delay_secs(&self) -> u64 {
        self.time_delay.unwrap_or(0)
    }

    pub fn event_type(&self) -> EventType {
        self.event_type.unwrap_or(EventType::All)
    }

    /// Parse and validate a `github` block.
    pub fn from_yaml(block: &Value) -> std::result::Result<Self, ConfigError> {
        let mut config = Self::module_defaults();

        let nodes = match block {
            Value::Mapping(map) => map,
            Value::Null => return Err(ConfigError::EmptyContent(TAG_API_AUTH.to_string())),
            _ => return Err(ConfigError::Invalid("'github' must be a mapping".to_string())),
        };

        for (key, value) in nodes {
            let tag = tag_name(key)?;
            match tag {
                TAG_ENABLED => config.enabled = yes_no(tag, value)?,
                TAG_RUN_ON_START => config.run_on_start = yes_no(tag, value)?,
                TAG_ONLY_FUTURE_EVENTS => config.only_future_events = yes_no(tag, value)?,
                TAG_INTERVAL => config.interval = Some(duration(tag, value)?),
                TAG_TIME_DELAY => config.time_delay = Some(duration(tag, value)?),
                TAG_API_AUTH => config.organizations.extend(api_auth(value)?),
                TAG_API_PARAMETERS => {
                    if let Some(event_type) = api_parameters(value)? {
                        config.event_type = Some(event_type);
                    }
                }
                other => return Err(ConfigError::UnknownTag(other.to_string())),
            }
        }

        if config.organizations.is_empty() {
            return Err(ConfigError::EmptyContent(TAG_API_AUTH.to_string()));
        }

        Ok(config)
    }
}

/// Parse a duration of the form `<integer><d|h|m|s|>` into seconds.
///
/// The integer part must satisfy `1 <= n < i32::MAX`.
pub fn parse_duration(input: &str) -> Option<u64> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, suffix) = input.split_at(split);

    if digits.is_empty() {
        return None;
    }

    let value: u64 = digits.parse().ok()?;
    if value == 0 || value >= i32::MAX as u64 {
        return None;
    }

    let multiplier = match suffix {
        "d" => 86_400,
        "h" => 3_600,
        "m" => 60,
        "s" | "" => 1,
        _ => return None,
    };

    Some(value * multiplier)
}

fn tag_name(key: &Value) -> std::result::Result<&str, ConfigError> {
    key.as_str()
        .ok_or_else(|| ConfigError::Invalid(format!("tag names must be strings, got {:?}", key)))
}

fn yes_no(tag: &str, value: &Value) -> std::result::Result<bool, ConfigError> {
    match value.as_str() {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        _ => Err(ConfigError::InvalidContent(tag.to_string())),
    }
}

fn duration(tag: &str, value: &Value) -> std::result::Result<u64, ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| parse_duration(&n.to_string())),
        Value::String(s) => parse_duration(s),
        _ => None,
    };
    parsed.ok_or_else(|| ConfigError::InvalidContent(tag.to_string()))
}

fn api_auth(value: &Value) -> std::result::Result<Vec<OrgCredential>, ConfigError> {
    match value {
        Value::Sequence(entries) => entries.iter().map(credential).collect(),
        Value::Mapping(_) => Ok(vec![credential(value)?]),
        _ => Err(ConfigError::InvalidContent(TAG_API_AUTH.to_string())),
    }
}

fn credential(entry: &Value) -> std::result::Result<OrgCredential, ConfigError> {
    let children: &Mapping = entry
        .as_mapping()
        .ok_or_else(|| ConfigError::InvalidContent(TAG_API_AUTH.to_string()))?;

    let mut org_name = None;
    let mut api_token = None;

    for (key, value) in children {
        let tag = tag_name(key)?;
        let slot = match tag {
            TAG_ORG_NAME => &mut org_name,
            TAG_API_TOKEN => &mut api_token,
            other => return Err(ConfigError::UnknownTag(other.to_string())),
        };
        let content = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
            _ => return Err(ConfigError::InvalidContent(tag.to_string())),
        };
        if content.is_empty() {
            return Err(ConfigError::EmptyContent(tag.to_string()));
        }
        *slot = Some(content);
    }

    let org_name = org_name.ok_or_else(|| ConfigError::MissingTag(TAG_ORG_NAME.to_string()))?;
    let api_token =
        api_token.ok_or_else(|| ConfigError::MissingTag(TAG_API_TOKEN.to_string()))?;

    Ok(OrgCredential::new(org_name, api_token))
}

fn api_parameters(value: &Value) -> std::result::Result<Option<EventType>, ConfigError> {
    let children = match value {
        Value::Mapping(map) => map,
        Value::Null => return Ok(None),
        _ => return Err(ConfigError::InvalidContent(TAG_API_PARAMETERS.to_string())),
    };

    let mut event_type = None;
    for (key, value) in children {
        match tag_name(key)? {
            TAG_EVENT_TYPE => {
                let parsed = value
                    .as_str()
                    .and_then(EventType::parse)
                    .ok_or_else(|| ConfigError::InvalidContent(TAG_EVENT_TYPE.to_string()))?;
                event_type = Some(parsed);
            }
            other => return Err(ConfigError::UnknownTag(other.to_string())),
        }
    }
    Ok(event_type)
}

/// Internal bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSettings {
    /// Path of the local datagram socket
    #[serde(default = "default_queue_path")]
    pub path: PathBuf,

    /// Outbound messages per second, shared by events and alerts
    #[serde(default = "default_max_eps")]
    pub max_eps: u32,
}

fn default_queue_path() -> PathBuf {
    PathBuf::from("/var/ossec/queue/sockets/queue")
}

fn default_max_eps() -> u32 {
    100
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            path: default_queue_path(),
            max_eps: default_max_eps(),
        }
    }
}

/// Cursor storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSettings {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/ossec/var/wodles/github")
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Entries requested per page (the API caps this at 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    github: Option<Value>,
    #[serde(default)]
    queue: QueueSettings,
    #[serde(default)]
    state: StateSettings,
    #[serde(default)]
    api: ApiSettings,
}

/// Full collector configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub github: GithubConfig,
    pub queue: QueueSettings,
    pub state: StateSettings,
    pub api: ApiSettings,
}

impl Settings {
    /// Resolve the config path from an explicit override or the default.
    pub fn resolve_path(path: Option<&str>) -> PathBuf {
        path.map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an optional path override
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(&Self::resolve_path(path))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let mut settings = Self::from_yaml_str(&contents)?;

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.is_empty() {
                settings.api.base_url = url;
            }
        }

        Ok(settings)
    }

    /// Parse and validate a configuration document
    pub fn from_yaml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let raw: RawSettings = serde_yaml::from_str(contents)?;

        let block = raw
            .github
            .ok_or_else(|| ConfigError::MissingTag(MODULE_NAME.to_string()))?;
        let github = GithubConfig::from_yaml(&block)?;

        if raw.queue.max_eps == 0 {
            return Err(ConfigError::Invalid("queue.max_eps must be at least 1".to_string()));
        }
        if raw.api.page_size == 0 || raw.api.page_size > 100 {
            return Err(ConfigError::Invalid(
                "api.page_size must be between 1 and 100".to_string(),
            ));
        }

        Ok(Self {
            github,
            queue: raw.queue,
            state: raw.state,
            api: raw.api,
        })
    }
}
