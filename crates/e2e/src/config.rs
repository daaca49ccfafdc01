//! Harness configuration
//!
//! Loaded from `e2e.toml` when present, then overridden by environment
//! variables (`ENVIRONMENT`, `PORT`, `BASE_URL`, `KAFKA_UI_URL`,
//! `EVENT_LOG_PATH`, `CI`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::poll::PollOptions;

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Free-form label for the target environment (local, dev, ...)
    pub environment: String,

    /// Port of the movie API on localhost
    pub port: u16,

    /// Full base URL; takes precedence over `port`
    pub base_url: Option<String>,

    /// Kafka UI, probed to decide whether event scenarios can run
    pub kafka_ui_url: String,

    /// NDJSON file the movie service mirrors its events into
    pub event_log_path: PathBuf,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// Timing for event-log polling
    pub poll: PollOptions,

    /// How to start the API server
    pub server: ServerSection,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            port: 3001,
            base_url: None,
            kafka_ui_url: "http://localhost:8085".to_string(),
            event_log_path: PathBuf::from("kafka-events.log"),
            request_timeout_secs: 10,
            poll: PollOptions::from_millis(10_000, 5_000),
            server: ServerSection::default(),
        }
    }
}

/// Server startup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Command line that starts the API, e.g. `["npm", "run", "start"]`
    pub command: Vec<String>,

    /// Working directory for the command (defaults to the current one)
    pub working_dir: Option<PathBuf>,

    pub startup_timeout_secs: u64,

    /// Use an already-running server on the base URL instead of spawning
    pub reuse_existing: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            command: vec!["npm".to_string(), "run".to_string(), "start".to_string()],
            working_dir: None,
            startup_timeout_secs: 60,
            reuse_existing: true,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file, falling back to defaults when it
    /// does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        Ok(config)
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, then apply the process environment
    pub fn load_with_env(path: &Path) -> E2eResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`)
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(environment) = lookup("ENVIRONMENT") {
            self.environment = environment;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| E2eError::Config(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(base_url) = lookup("BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(url) = lookup("KAFKA_UI_URL") {
            self.kafka_ui_url = url;
        }
        if let Some(path) = lookup("EVENT_LOG_PATH") {
            self.event_log_path = PathBuf::from(path);
        }
        if lookup("CI").is_some_and(|v| !v.is_empty()) {
            self.server.reuse_existing = false;
        }
        self.validate()
    }

    /// Override poll timing (e.g. from the command line); either value may be
    /// left as configured. The result is validated like a loaded config.
    pub fn override_poll(&mut self, timeout_ms: Option<u64>, interval_ms: Option<u64>) -> E2eResult<()> {
        self.poll = PollOptions::from_millis(
            timeout_ms.unwrap_or(self.poll.timeout_ms),
            interval_ms.unwrap_or(self.poll.interval_ms),
        );
        self.validate()
    }

    /// Poll interval must be positive and no longer than the timeout
    pub fn validate(&self) -> E2eResult<()> {
        if self.poll.interval_ms == 0 {
            return Err(E2eError::Config("poll.interval_ms must be greater than 0".to_string()));
        }
        if self.poll.timeout_ms < self.poll.interval_ms {
            return Err(E2eError::Config(format!(
                "poll.timeout_ms ({}) must be at least poll.interval_ms ({})",
                self.poll.timeout_ms, self.poll.interval_ms
            )));
        }
        Ok(())
    }

    /// Base URL of the movie API without a trailing slash
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server.startup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.base_url(), "http://localhost:3001");
        assert_eq!(config.poll, PollOptions::from_millis(10_000, 5_000));
        assert!(config.server.reuse_existing);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = HarnessConfig::from_toml(
            r#"
environment = "dev"
base_url = "https://movies.dev.example.com/"
event_log_path = "/var/log/movie-events.log"

[poll]
timeout_ms = 2000
interval_ms = 250

[server]
command = ["cargo", "run", "-p", "movie-api"]
"#,
        )
        .unwrap();

        assert_eq!(config.environment, "dev");
        assert_eq!(config.base_url(), "https://movies.dev.example.com");
        assert_eq!(config.poll.interval_ms, 250);
        assert_eq!(config.server.command[0], "cargo");
        assert_eq!(config.server.startup_timeout_secs, 60);
        assert_eq!(config.kafka_ui_url, "http://localhost:8085");
    }

    #[test]
    fn test_rejects_bad_poll_options() {
        let err = HarnessConfig::from_toml("[poll]\ntimeout_ms = 100\ninterval_ms = 500\n").unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));

        let err = HarnessConfig::from_toml("[poll]\ntimeout_ms = 100\ninterval_ms = 0\n").unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "4000"),
            ("KAFKA_UI_URL", "http://kafka-ui:8080"),
            ("EVENT_LOG_PATH", "/tmp/events.log"),
            ("CI", "true"),
        ]);

        let mut config = HarnessConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.base_url(), "http://localhost:4000");
        assert_eq!(config.kafka_ui_url, "http://kafka-ui:8080");
        assert_eq!(config.event_log_path, PathBuf::from("/tmp/events.log"));
        assert!(!config.server.reuse_existing);
    }

    #[test]
    fn test_base_url_env_wins_over_port() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ENVIRONMENT", "staging"),
            ("PORT", "4000"),
            ("BASE_URL", "https://movies.staging.example.com/"),
        ]);

        let mut config = HarnessConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.environment, "staging");
        assert_eq!(config.port, 4000);
        assert_eq!(config.base_url(), "https://movies.staging.example.com");
    }

    #[test]
    fn test_poll_override_is_validated() {
        let mut config = HarnessConfig::default();

        config.override_poll(None, Some(250)).unwrap();
        assert_eq!(config.poll, PollOptions::from_millis(10_000, 250));

        let err = config.override_poll(None, Some(0)).unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));

        let err = config.override_poll(Some(100), Some(500)).unwrap_err();
        assert!(err.to_string().contains("poll.timeout_ms"), "{err}");
    }

    #[test]
    fn test_invalid_port_env() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_env(|key| (key == "PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = HarnessConfig::load(Path::new("/nonexistent/e2e.toml")).unwrap();
        assert_eq!(config, HarnessConfig::default());
    }
}
