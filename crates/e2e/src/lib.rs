//! Movie API E2E Test Framework
//!
//! This crate drives the movie CRUD API end to end and checks that each
//! mutation shows up as a domain event in the service's event log:
//! - Starts the API (or reuses a running one) and waits for it to answer
//! - Calls the CRUD endpoints and matches response bodies
//! - Polls the NDJSON event log until the expected event appears
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── run_all() / run_tagged() / run_named()               │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario                                                   │
//! │    ├── token-acquisition                                    │
//! │    ├── crud-movie        (ApiClient + Expect)               │
//! │    └── crud-movie-event  (+ EventLog::wait_for)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  EventLog::wait_for                                         │
//! │    └── eventually(PollOptions, || read_movie_events(..))    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod expect;
pub mod movie;
pub mod poll;
pub mod runner;
pub mod scenario;
pub mod server;

pub use client::{ApiClient, ApiRequest, ApiResponse};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult};
pub use events::{read_movie_events, EventLog, MovieAction, ParsedEvent};
pub use expect::Expect;
pub use poll::{eventually, PollOptions};
pub use runner::TestRunner;
pub use scenario::{Scenario, ScenarioContext};
