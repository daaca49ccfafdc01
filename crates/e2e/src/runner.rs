//! Main test runner that orchestrates the server and the scenarios

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::scenario::{Outcome, Scenario, ScenarioContext};
use crate::server::{ServerConfig, ServerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    /// Failure message, or the reason for a skip
    pub error: Option<String>,
}

impl TestResult {
    pub fn success(&self) -> bool {
        self.status != TestStatus::Failed
    }
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, started_at: DateTime<Utc>, duration_ms: u64) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            duration_ms,
            started_at,
            results,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    harness: HarnessConfig,

    /// Start (or reuse) the API server before running
    start_server: bool,

    /// Running server handle (if any)
    server: Option<ServerHandle>,

    /// Output directory for results
    output_dir: PathBuf,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            harness: config.harness,
            start_server: config.start_server,
            server: None,
            output_dir: config.output_dir,
        }
    }

    pub fn harness(&self) -> &HarnessConfig {
        &self.harness
    }

    /// Start the server
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() || !self.start_server {
            return Ok(());
        }

        let server = ServerHandle::start(ServerConfig::from_harness(&self.harness)).await?;
        match server.pid() {
            Some(pid) => debug!("Server pid {} will be stopped after the run", pid),
            None => debug!("Server at {} is not ours; leaving it running", server.base_url()),
        }
        self.server = Some(server);
        Ok(())
    }

    /// Stop the server
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    fn context(&self) -> E2eResult<ScenarioContext> {
        let ctx = ScenarioContext::from_config(&self.harness)?;
        match &self.server {
            Some(server) => ctx.with_base_url(server.base_url(), &self.harness),
            None => Ok(ctx),
        }
    }

    /// Run every scenario
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        self.run_scenarios(&Scenario::all()).await
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let selected: Vec<Scenario> = Scenario::all()
            .into_iter()
            .filter(|s| s.tags().contains(&tag))
            .collect();
        if selected.is_empty() {
            warn!("No scenarios tagged '{}'", tag);
        }
        self.run_scenarios(&selected).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<TestSuiteResult> {
        let scenario = Scenario::from_name(name)
            .ok_or_else(|| E2eError::Config(format!("Unknown scenario: {}", name)))?;
        self.run_scenarios(&[scenario]).await
    }

    /// Run a list of scenarios; a failure does not stop the rest
    pub async fn run_scenarios(&mut self, scenarios: &[Scenario]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        // Ensure server is running
        self.start_server().await?;
        let ctx = self.context()?;

        info!("Running {} scenario(s) against {}...", scenarios.len(), ctx.client.base_url());

        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let result = run_one(*scenario, &ctx).await;
            match result.status {
                TestStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                TestStatus::Skipped => info!(
                    "- {} skipped: {}",
                    result.name,
                    result.error.as_deref().unwrap_or("no reason given")
                ),
                TestStatus::Failed => error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::from_results(results, started_at, duration_ms);

        info!("");
        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );

        Ok(suite)
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

/// Run one scenario and turn its outcome into a [`TestResult`]
pub async fn run_one(scenario: Scenario, ctx: &ScenarioContext) -> TestResult {
    let start = Instant::now();
    debug!("Running scenario: {}", scenario);

    let (status, error) = match scenario.run(ctx).await {
        Ok(Outcome::Passed) => (TestStatus::Passed, None),
        Ok(Outcome::Skipped(reason)) => (TestStatus::Skipped, Some(reason)),
        Err(e) => (TestStatus::Failed, Some(e.to_string())),
    };

    TestResult {
        name: scenario.name().to_string(),
        status,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub harness: HarnessConfig,
    pub start_server: bool,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            start_server: true,
            output_dir: PathBuf::from("test-results"),
        }
    }
}
