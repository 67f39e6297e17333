//! Error types for the GitHub audit-log collector

use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors. All of them are fatal at load time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid content for tag '{0}' at module 'github'.")]
    InvalidContent(String),

    #[error("Empty content for tag '{0}' at module 'github'.")]
    EmptyContent(String),

    #[error("No such tag '{0}' at module 'github'.")]
    UnknownTag(String),

    #[error("'{0}' is missing at module 'github'.")]
    MissingTag(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Errors raised while scanning one organization.
///
/// These never abort a cycle; the executor turns them into a failure record.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unexpected status code {status}")]
    HttpStatus { status: u16, body: String },

    #[error("Error parsing response body: {0}")]
    Parse(String),
}

impl ScanError {
    /// Message handed to the failure tracker for this error.
    ///
    /// For status errors this is the raw response body, which the API
    /// returns as a JSON document.
    pub fn failure_message(&self) -> Option<String> {
        match self {
            ScanError::HttpStatus { body, .. } if body.is_empty() => None,
            ScanError::HttpStatus { body, .. } => Some(body.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Connection("Request timed out".to_string())
        } else if err.is_connect() {
            ScanError::Connection("Failed to connect to API".to_string())
        } else {
            ScanError::Connection(err.to_string())
        }
    }
}

/// Internal message bus errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Can't connect to queue '{path}': {reason}")]
    Connect { path: String, reason: String },

    #[error("Queue '{path}' not accessible: '{reason}'")]
    Send { path: String, reason: String },
}

/// Cursor persistence errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State storage I/O error: {0}")]
    Io(String),

    #[error("State database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
