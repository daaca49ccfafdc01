//! Server management - spawning (or reusing) the movie API and health checking it

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};

/// Handle to the movie API under test
pub struct ServerHandle {
    /// None when an already-running server was reused
    child: Option<Child>,
    pub base_url: String,
}

impl ServerHandle {
    /// Reuse a running server if allowed and reachable, otherwise spawn one
    pub async fn start(config: ServerConfig) -> E2eResult<Self> {
        if config.reuse_existing && is_up(&config.base_url).await {
            info!("Reusing running server at {}", config.base_url);
            return Ok(Self {
                child: None,
                base_url: config.base_url,
            });
        }

        Self::spawn(config).await
    }

    /// Spawn the server command and wait until it answers
    pub async fn spawn(config: ServerConfig) -> E2eResult<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| E2eError::ServerStartup("empty server command".to_string()))?;

        info!("Spawning `{}` on port {}", config.command.join(" "), config.port);

        let mut cmd = Command::new(program);
        cmd.args(args).env("PORT", config.port.to_string());

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        // Server output goes straight to the harness console
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;

        let mut handle = ServerHandle {
            child: Some(child),
            base_url: config.base_url.clone(),
        };

        // Wait for server to be healthy; never leave a half-started child behind
        if let Err(e) = handle.wait_for_healthy(config.startup_timeout).await {
            handle.stop()?;
            return Err(e);
        }

        info!("Server is up at {}", handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to answer on its base URL
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.base_url).send().await {
                Ok(resp) if is_up_status(resp.status().as_u16()) => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    // Connection refused is expected while server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when this handle owns the server process
    pub fn is_owned(&self) -> bool {
        self.child.is_some()
    }

    /// Process id of a spawned server
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Stop the server if we started it
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping server (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                // Give it a moment to shut down gracefully
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for starting the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Program and arguments
    pub command: Vec<String>,

    pub working_dir: Option<PathBuf>,

    /// URL probed for readiness; also the URL a reused server must answer on
    pub base_url: String,

    /// Exported to the command as `PORT`
    pub port: u16,

    pub startup_timeout: Duration,

    pub reuse_existing: bool,
}

impl ServerConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            command: config.server.command.clone(),
            working_dir: config.server.working_dir.clone(),
            base_url: config.base_url(),
            port: config.port,
            startup_timeout: config.startup_timeout(),
            reuse_existing: config.server.reuse_existing,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_harness(&HarnessConfig::default())
    }
}

/// A server counts as up once it answers with anything short of 404
fn is_up_status(status: u16) -> bool {
    status < 404
}

/// True when something answers on `url` with a status short of 404
pub async fn is_up(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(2)).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    matches!(client.get(url).send().await, Ok(resp) if is_up_status(resp.status().as_u16()))
}

/// True when `url` answers `GET` with 200 OK
pub async fn is_reachable(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(Duration::from_secs(5)).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.get(url).send().await {
        Ok(resp) => resp.status() == reqwest::StatusCode::OK,
        Err(e) => {
            info!("{} is not reachable: {}", url, e);
            false
        }
    }
}
