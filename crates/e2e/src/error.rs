//! Error types for the movie e2e harness

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Failed to read event log {}: {source}", path.display())]
    EventLogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Event log line {line} is not valid JSON: {source}")]
    EventDecode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Event log line {line} is malformed: {reason}")]
    MalformedEvent { line: usize, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// True for the errors a broken event log produces (unreadable or undecodable)
    pub fn is_event_log_error(&self) -> bool {
        matches!(
            self,
            E2eError::EventLogRead { .. } | E2eError::EventDecode { .. } | E2eError::MalformedEvent { .. }
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
