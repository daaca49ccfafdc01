use std::path::PathBuf;

use movie_events_e2e::scenario::{self, Outcome, ScenarioContext};
use movie_events_e2e::server::is_reachable;
use movie_events_e2e::HarnessConfig;

fn live_context() -> ScenarioContext {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("e2e.toml");
    let config = HarnessConfig::load_with_env(&config_path).expect("load harness config");
    ScenarioContext::from_config(&config).expect("build scenario context")
}

async fn api_is_up(ctx: &ScenarioContext) -> bool {
    // any answer at all means something is listening; the scenarios check the rest
    reqwest::get(ctx.client.base_url()).await.is_ok()
}

/// Live movie API: token endpoint
///
/// Marked ignored because it needs the movie API running on `BASE_URL` / `PORT`.
#[tokio::test]
#[ignore]
async fn live_token_acquisition() {
    let ctx = live_context();
    if !api_is_up(&ctx).await {
        eprintln!("Skipping: movie API not reachable at {}", ctx.client.base_url());
        return;
    }

    let outcome = scenario::token_acquisition(&ctx).await.expect("token acquisition");
    assert_eq!(outcome, Outcome::Passed);
}

/// Live movie API: full CRUD cycle
#[tokio::test]
#[ignore]
async fn live_crud_movie() {
    let ctx = live_context();
    if !api_is_up(&ctx).await {
        eprintln!("Skipping: movie API not reachable at {}", ctx.client.base_url());
        return;
    }

    let outcome = scenario::crud_movie(&ctx).await.expect("crud movie");
    assert_eq!(outcome, Outcome::Passed);
}

/// Live movie API: CRUD cycle plus Kafka events mirrored to the event log
///
/// Also needs Kafka and its UI (`KAFKA_UI_URL`); skips otherwise.
#[tokio::test]
#[ignore]
async fn live_crud_movie_event() {
    let ctx = live_context();
    if !is_reachable(&ctx.kafka_ui_url).await {
        eprintln!("Skipping: Kafka UI not reachable at {}", ctx.kafka_ui_url);
        return;
    }

    match scenario::crud_movie_event(&ctx).await.expect("crud movie event") {
        Outcome::Passed => {}
        Outcome::Skipped(reason) => eprintln!("Skipped: {reason}"),
    }
}
