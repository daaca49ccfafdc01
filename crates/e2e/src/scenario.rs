//! End-to-end scenarios against the movie API

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::client::{ApiClient, ApiRequest};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::events::{EventLog, MovieAction};
use crate::expect::{expect_status, Expect};
use crate::movie::{generate_movie_without_id, MovieUpdate};
use crate::poll::PollOptions;
use crate::server::is_reachable;

/// Everything a scenario needs to talk to the system under test
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub client: ApiClient,
    pub event_log: EventLog,
    pub poll: PollOptions,
    pub kafka_ui_url: String,
}

impl ScenarioContext {
    pub fn from_config(config: &HarnessConfig) -> E2eResult<Self> {
        Ok(Self {
            client: ApiClient::with_timeout(config.base_url(), config.request_timeout())?,
            event_log: EventLog::new(&config.event_log_path),
            poll: config.poll,
            kafka_ui_url: config.kafka_ui_url.clone(),
        })
    }

    /// Point the client at a different base URL (e.g. a freshly spawned server)
    pub fn with_base_url(mut self, base_url: &str, config: &HarnessConfig) -> E2eResult<Self> {
        self.client = ApiClient::with_timeout(base_url, config.request_timeout())?;
        Ok(self)
    }
}

/// How a scenario ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    TokenAcquisition,
    CrudMovie,
    CrudMovieEvent,
}

impl Scenario {
    pub fn all() -> [Scenario; 3] {
        [Scenario::TokenAcquisition, Scenario::CrudMovie, Scenario::CrudMovieEvent]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::TokenAcquisition => "token-acquisition",
            Scenario::CrudMovie => "crud-movie",
            Scenario::CrudMovieEvent => "crud-movie-event",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Scenario::TokenAcquisition => &["auth", "smoke"],
            Scenario::CrudMovie => &["crud", "smoke"],
            Scenario::CrudMovieEvent => &["crud", "events"],
        }
    }

    pub fn from_name(name: &str) -> Option<Scenario> {
        Self::all().into_iter().find(|s| s.name() == name)
    }

    pub async fn run(&self, ctx: &ScenarioContext) -> E2eResult<Outcome> {
        match self {
            Scenario::TokenAcquisition => token_acquisition(ctx).await,
            Scenario::CrudMovie => crud_movie(ctx).await,
            Scenario::CrudMovieEvent => crud_movie_event(ctx).await,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `GET /auth/fake-token` returns 200 and a string token
pub async fn token_acquisition(ctx: &ScenarioContext) -> E2eResult<Outcome> {
    let response = ctx.client.request::<Value>(ApiRequest::get("/auth/fake-token")).await?;
    expect_status(response.status, 200)?;
    Expect::object_containing([("token", Expect::any_string())]).check(&response.body)?;

    // typed helper agrees with the raw call
    let typed = ctx.client.fake_token().await?;
    expect_status(typed.status, 200)?;
    if typed.body.token.is_empty() {
        return Err(E2eError::AssertionFailed("fake token is empty".to_string()));
    }

    Ok(Outcome::Passed)
}

/// Full create / read / update / delete cycle
pub async fn crud_movie(ctx: &ScenarioContext) -> E2eResult<Outcome> {
    crud_flow(ctx, false).await?;
    Ok(Outcome::Passed)
}

/// CRUD cycle that also waits for each domain event in the event log.
/// Skipped when the Kafka UI is not reachable, since no events will flow.
pub async fn crud_movie_event(ctx: &ScenarioContext) -> E2eResult<Outcome> {
    if !is_reachable(&ctx.kafka_ui_url).await {
        return Ok(Outcome::Skipped(format!("Kafka UI not reachable at {}", ctx.kafka_ui_url)));
    }

    crud_flow(ctx, true).await?;
    Ok(Outcome::Passed)
}

/// Expect exactly one event for `movie_id` on `action`'s topic
pub fn single_event_expectation(action: MovieAction, movie_id: i64) -> Expect {
    Expect::array([Expect::object([
        ("topic", Expect::equal(action.topic())),
        ("key", Expect::equal(movie_id.to_string())),
        (
            "movie",
            Expect::object([
                ("id", Expect::equal(movie_id)),
                ("name", Expect::any_string()),
                ("year", Expect::any_number()),
                ("rating", Expect::any_number()),
                ("director", Expect::any_string()),
            ]),
        ),
    ])])
}

async fn crud_flow(ctx: &ScenarioContext, with_events: bool) -> E2eResult<()> {
    let client = &ctx.client;
    let movie = generate_movie_without_id();
    let updated = generate_movie_without_id();

    let token = client.fake_token().await?;
    expect_status(token.status, 200)?;
    let token = token.body.token;

    // create
    let created = client.add_movie(&token, &movie).await?;
    expect_status(created.status, 200)?;
    let movie_id = created.body["data"]["id"].as_i64().ok_or_else(|| {
        E2eError::AssertionFailed(format!("create response has no numeric data.id: {}", created.body))
    })?;
    info!("Created movie {} ({})", movie_id, movie.name);

    let stored = Expect::matching(json!({
        "status": 200,
        "data": movie.with_id(movie_id),
    }));
    stored.check(&created.body)?;

    if with_events {
        ctx.event_log
            .wait_for(movie_id, MovieAction::Created, ctx.poll, &single_event_expectation(MovieAction::Created, movie_id))
            .await?;
    }

    // read all
    let all = client.get_all_movies(&token).await?;
    expect_status(all.status, 200)?;
    Expect::object_containing([
        ("status", Expect::equal(200)),
        (
            "data",
            Expect::array_containing([Expect::object_containing([
                ("id", Expect::equal(movie_id)),
                ("name", Expect::equal(movie.name.as_str())),
            ])]),
        ),
    ])
    .check(&all.body)?;

    // read by id
    let by_id = client.get_movie_by_id(&token, movie_id).await?;
    expect_status(by_id.status, 200)?;
    stored.check(&by_id.body)?;

    // read by name
    let by_name = client.get_movie_by_name(&token, &movie.name).await?;
    expect_status(by_name.status, 200)?;
    Expect::matching(json!({
        "status": 200,
        "data": [movie.with_id(movie_id)],
    }))
    .check(&by_name.body)?;

    // update
    let update = MovieUpdate::from(updated.clone());
    let after_update = client.update_movie(&token, movie_id, &update).await?;
    expect_status(after_update.status, 200)?;
    Expect::matching(json!({
        "status": 200,
        "data": updated.with_id(movie_id),
    }))
    .check(&after_update.body)?;

    if with_events {
        ctx.event_log
            .wait_for(movie_id, MovieAction::Updated, ctx.poll, &single_event_expectation(MovieAction::Updated, movie_id))
            .await?;
    }

    // delete
    let deleted = client.delete_movie(&token, movie_id).await?;
    expect_status(deleted.status, 200)?;
    Expect::matching(json!({
        "status": 200,
        "message": format!("Movie {} has been deleted", movie_id),
    }))
    .check(&deleted.body)?;

    if with_events {
        ctx.event_log
            .wait_for(movie_id, MovieAction::Deleted, ctx.poll, &single_event_expectation(MovieAction::Deleted, movie_id))
            .await?;
    }

    // gone from the listing
    let all_after = client.get_all_movies(&token).await?;
    Expect::object_containing([
        ("status", Expect::equal(200)),
        (
            "data",
            Expect::not_array_containing([Expect::object_containing([("id", Expect::equal(movie_id))])]),
        ),
    ])
    .check(&all_after.body)?;

    // second delete is a 404
    let missing = client.delete_movie(&token, movie_id).await?;
    expect_status(missing.status, 404)?;
    Expect::matching(json!({
        "error": format!("Movie with ID {} not found", movie_id),
    }))
    .check(&missing.body)?;

    Ok(())
}
