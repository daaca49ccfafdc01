//! In-process stand-in for the movie service
//!
//! Serves the same routes as the real API and mirrors every mutation into an
//! NDJSON event log after a configurable delay, the way the real service's
//! Kafka consumer does.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path as FsPath, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use movie_events_e2e::config::HarnessConfig;
use movie_events_e2e::events::MovieAction;
use movie_events_e2e::movie::{Movie, MovieUpdate, NewMovie};
use movie_events_e2e::{E2eResult, PollOptions, ScenarioContext};
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct FakeOptions {
    /// How long after a mutation its event lands in the log
    pub event_delay: Duration,

    /// Write events at all
    pub emit_events: bool,

    /// Answer 200 on `/kafka-ui`
    pub kafka_ui_up: bool,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            event_delay: Duration::from_millis(100),
            emit_events: true,
            kafka_ui_up: true,
        }
    }
}

struct FakeState {
    movies: Mutex<BTreeMap<i64, Movie>>,
    next_id: AtomicI64,
    event_log: PathBuf,
    options: FakeOptions,
}

pub struct FakeMovieApi {
    pub base_url: String,
    pub event_log: PathBuf,
    _dir: TempDir,
    server: JoinHandle<()>,
}

impl FakeMovieApi {
    pub async fn spawn() -> Self {
        Self::spawn_with(FakeOptions::default()).await
    }

    pub async fn spawn_with(options: FakeOptions) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let event_log = dir.path().join("kafka-events.log");
        std::fs::write(&event_log, "").expect("create event log");

        let state = Arc::new(FakeState {
            movies: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            event_log: event_log.clone(),
            options,
        });

        let app = Router::new()
            .route("/", get(|| async { "movie api" }))
            .route("/auth/fake-token", get(fake_token))
            .route("/kafka-ui", get(kafka_ui))
            .route("/movie", axum::routing::post(add_movie))
            .route("/movies", get(list_movies))
            .route("/movies/:id", get(get_movie).put(update_movie).delete(delete_movie))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake api");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake api server");
        });

        Self {
            base_url: format!("http://{}", addr),
            event_log,
            _dir: dir,
            server,
        }
    }

    pub fn kafka_ui_url(&self) -> String {
        format!("{}/kafka-ui", self.base_url)
    }

    /// Harness config pointed at this fake
    pub fn harness_config(&self, poll: PollOptions) -> HarnessConfig {
        HarnessConfig {
            base_url: Some(self.base_url.clone()),
            kafka_ui_url: self.kafka_ui_url(),
            event_log_path: self.event_log.clone(),
            poll,
            ..HarnessConfig::default()
        }
    }

    pub fn context(&self, poll: PollOptions) -> E2eResult<ScenarioContext> {
        ScenarioContext::from_config(&self.harness_config(poll))
    }
}

impl Drop for FakeMovieApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn not_found(id: i64) -> Response {
    error(StatusCode::NOT_FOUND, format!("Movie with ID {} not found", id))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("fake-token"))
}

fn emit(state: &Arc<FakeState>, action: MovieAction, movie: &Movie) {
    if !state.options.emit_events {
        return;
    }

    let line = json!({
        "topic": action.topic(),
        "messages": [{
            "key": movie.id.to_string(),
            "value": serde_json::to_string(movie).expect("serialize movie"),
        }]
    })
    .to_string()
        + "\n";

    let path = state.event_log.clone();
    let delay = state.options.event_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        append(&path, &line);
    });
}

fn append(path: &FsPath, line: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .expect("open event log");
    file.write_all(line.as_bytes()).expect("append event");
}

async fn fake_token() -> Json<serde_json::Value> {
    Json(json!({ "token": format!("fake-token-{}", rand::random::<u32>()) }))
}

async fn kafka_ui(State(state): State<Arc<FakeState>>) -> StatusCode {
    if state.options.kafka_ui_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn add_movie(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<NewMovie>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let movie = body.with_id(id);
    state.movies.lock().unwrap().insert(id, movie.clone());
    emit(&state, MovieAction::Created, &movie);

    Json(json!({ "status": 200, "data": movie })).into_response()
}

async fn list_movies(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    let movies = state.movies.lock().unwrap();
    let data: Vec<&Movie> = match params.get("name") {
        Some(name) => movies.values().filter(|m| &m.name == name).collect(),
        None => movies.values().collect(),
    };

    Json(json!({ "status": 200, "data": data })).into_response()
}

async fn get_movie(State(state): State<Arc<FakeState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    match state.movies.lock().unwrap().get(&id) {
        Some(movie) => Json(json!({ "status": 200, "data": movie })).into_response(),
        None => not_found(id),
    }
}

async fn update_movie(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(update): Json<MovieUpdate>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    let updated = {
        let mut movies = state.movies.lock().unwrap();
        let Some(movie) = movies.get_mut(&id) else {
            return not_found(id);
        };
        if let Some(name) = update.name {
            movie.name = name;
        }
        if let Some(year) = update.year {
            movie.year = year;
        }
        if let Some(rating) = update.rating {
            movie.rating = rating;
        }
        if let Some(director) = update.director {
            movie.director = director;
        }
        movie.clone()
    };
    emit(&state, MovieAction::Updated, &updated);

    Json(json!({ "status": 200, "data": updated })).into_response()
}

async fn delete_movie(State(state): State<Arc<FakeState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Unauthorized".to_string());
    }

    let removed = state.movies.lock().unwrap().remove(&id);
    match removed {
        Some(movie) => {
            emit(&state, MovieAction::Deleted, &movie);
            Json(json!({ "status": 200, "message": format!("Movie {} has been deleted", id) })).into_response()
        }
        None => not_found(id),
    }
}
