//! Event log reader
//!
//! The movie service publishes every domain event to Kafka and also appends it
//! to a newline-delimited JSON file. That file is the side channel the e2e
//! scenarios use to confirm an event was emitted. Each line looks like:
//!
//! ```text
//! {"topic":"movie-created","messages":[{"key":"7","value":"{\"id\":7,\"name\":\"Inception\",...}"}]}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{E2eError, E2eResult};
use crate::expect::Expect;
use crate::poll::{eventually, PollOptions};

/// One line of the event log, as written by the producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub topic: String,
    pub messages: Vec<LogMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    /// Message key as written by the producer. A missing key is `None`; a
    /// non-string key (e.g. `7`) is a decode error for the whole line.
    #[serde(default)]
    pub key: Option<String>,

    /// JSON-encoded payload
    pub value: String,
}

/// A log entry reduced to its first message, with the payload decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvent {
    pub topic: String,
    pub key: Option<String>,
    pub movie: Map<String, Value>,
}

impl ParsedEvent {
    /// Project a decoded log line. `line` is 1-based and only used for errors.
    fn from_entry(entry: LogEntry, line: usize) -> E2eResult<Self> {
        let LogEntry { topic, messages } = entry;
        let first = messages.into_iter().next().ok_or_else(|| E2eError::MalformedEvent {
            line,
            reason: format!("'{}' entry has no messages", topic),
        })?;

        let payload: Value = serde_json::from_str(&first.value)
            .map_err(|source| E2eError::EventDecode { line, source })?;

        let movie = match payload {
            Value::Object(map) => map,
            other => {
                return Err(E2eError::MalformedEvent {
                    line,
                    reason: format!("payload is not a JSON object: {}", other),
                })
            }
        };

        Ok(Self {
            topic,
            key: first.key,
            movie,
        })
    }

    /// The payload's `id` if it is numeric
    pub fn movie_id(&self) -> Option<f64> {
        self.movie.get("id").and_then(Value::as_f64)
    }

    /// Decode the payload into a typed struct
    pub fn movie_as<T: DeserializeOwned>(&self) -> E2eResult<T> {
        Ok(serde_json::from_value(Value::Object(self.movie.clone()))?)
    }

    fn has_movie_id(&self, movie_id: i64) -> bool {
        match self.movie.get("id") {
            Some(Value::Number(n)) => match n.as_i64() {
                Some(id) => id == movie_id,
                None => n.as_f64() == Some(movie_id as f64),
            },
            _ => false,
        }
    }
}

/// Kinds of movie event, one topic each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieAction {
    Created,
    Updated,
    Deleted,
}

impl MovieAction {
    pub fn topic(&self) -> &'static str {
        match self {
            MovieAction::Created => "movie-created",
            MovieAction::Updated => "movie-updated",
            MovieAction::Deleted => "movie-deleted",
        }
    }

    pub fn all() -> [MovieAction; 3] {
        [MovieAction::Created, MovieAction::Updated, MovieAction::Deleted]
    }
}

impl fmt::Display for MovieAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic())
    }
}

/// Decode the full text of an event log, in file order.
///
/// Blank lines are skipped. Any undecodable line fails the whole parse.
pub fn parse_event_log(content: &str) -> E2eResult<Vec<ParsedEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let line_no = idx + 1;
            let entry: LogEntry = serde_json::from_str(line)
                .map_err(|source| E2eError::EventDecode { line: line_no, source })?;
            ParsedEvent::from_entry(entry, line_no)
        })
        .collect()
}

/// Keep events on `topic` whose payload id equals `movie_id`, preserving order
pub fn filter_by_topic_and_id(movie_id: i64, topic: &str, events: Vec<ParsedEvent>) -> Vec<ParsedEvent> {
    events
        .into_iter()
        .filter(|event| event.topic == topic && event.has_movie_id(movie_id))
        .collect()
}

/// Read the event log at `path` and return the events for one movie on one topic.
///
/// A missing file or a bad line is logged and returned as an error; an empty
/// result only means nothing matched.
pub async fn read_movie_events(movie_id: i64, topic: &str, path: &Path) -> E2eResult<Vec<ParsedEvent>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(source) => {
            error!("Error reading event log {}: {}", path.display(), source);
            return Err(E2eError::EventLogRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let events = parse_event_log(&content).map_err(|e| {
        error!("Error parsing event log {}: {}", path.display(), e);
        e
    })?;

    let matched = filter_by_topic_and_id(movie_id, topic, events);
    debug!("{} '{}' event(s) for movie {} in {}", matched.len(), topic, movie_id, path.display());
    Ok(matched)
}

/// Handle on the event log file written by the movie service
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self, movie_id: i64, action: MovieAction) -> E2eResult<Vec<ParsedEvent>> {
        self.read_topic(movie_id, action.topic()).await
    }

    pub async fn read_topic(&self, movie_id: i64, topic: &str) -> E2eResult<Vec<ParsedEvent>> {
        read_movie_events(movie_id, topic, &self.path).await
    }

    /// Poll the log until the events for `movie_id` on `action`'s topic match
    /// `expected`, returning them. On timeout the last mismatch (or read error)
    /// is returned.
    pub async fn wait_for(
        &self,
        movie_id: i64,
        action: MovieAction,
        options: PollOptions,
        expected: &Expect,
    ) -> E2eResult<Vec<ParsedEvent>> {
        let log = self;
        eventually(options, move || async move {
            let events = log.read(movie_id, action).await?;
            expected.check(&serde_json::to_value(&events)?)?;
            Ok::<_, E2eError>(events)
        })
        .await
    }
}
