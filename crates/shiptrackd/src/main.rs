// # shiptrackd - package tracking daemon
//
// Thin integration layer: tracking logic lives in shiptrack-core, the
// Ship24 backend in shiptrack-ship24 and the HTTP surface in shiptrack-http.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Verifying the API key and opening the tracked store
// 4. Running the update coordinator next to the HTTP server
//
// ## Configuration
//
// ### Ship24 API
// - `SHIPTRACK_API_KEY`: API key (required)
// - `SHIPTRACK_API_BASE_URL`: API base URL
// - `SHIPTRACK_HTTP_TIMEOUT_SECS`: per-request timeout
//
// ### Tracked Store
// - `SHIPTRACK_STORE_TYPE`: Type of store (file, memory)
// - `SHIPTRACK_STORE_PATH`: Path to store file (for file store)
//
// ### Coordinator
// - `SHIPTRACK_UPDATE_INTERVAL_SECS`: Poll interval without a webhook
// - `SHIPTRACK_WEBHOOK_ID`: Enables `/api/webhook/{id}` and the longer
//   webhook poll interval
// - `SHIPTRACK_TRACKING_NUMBERS`: Comma-separated numbers to track at startup
//
// ### Server
// - `SHIPTRACK_BIND_ADDR`: Listen address (default 0.0.0.0:8080)
//
// ## Example
//
// ```bash
// export SHIPTRACK_API_KEY=your_key
// export SHIPTRACK_STORE_TYPE=file
// export SHIPTRACK_STORE_PATH=/var/lib/shiptrack/tracked.json
// export SHIPTRACK_TRACKING_NUMBERS=S24DEMO456393
//
// shiptrackd
// ```

use anyhow::Result;
use shiptrack_core::{
    CoordinatorEvent, FailureKind, StoreConfig, TrackerConfig, TrackingBackend, UpdateCoordinator,
    WebhookConfig,
};
use shiptrack_http::AppState;
use shiptrack_ship24::Ship24Backend;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ShiptrackExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ShiptrackExitCode> for ExitCode {
    fn from(code: ShiptrackExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration read from the environment
struct Config {
    api_key: String,
    api_base_url: Option<String>,
    http_timeout_secs: Option<u64>,
    store_type: String,
    store_path: Option<String>,
    update_interval_secs: Option<u64>,
    webhook_id: Option<String>,
    bind_addr: String,
    tracking_numbers: Vec<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: env::var("SHIPTRACK_API_KEY").map_err(|_| {
                anyhow::anyhow!(
                    "SHIPTRACK_API_KEY is required. \
                    Set it via: export SHIPTRACK_API_KEY=your_key"
                )
            })?,
            api_base_url: env::var("SHIPTRACK_API_BASE_URL").ok(),
            http_timeout_secs: parse_var("SHIPTRACK_HTTP_TIMEOUT_SECS")?,
            store_type: env::var("SHIPTRACK_STORE_TYPE").unwrap_or_else(|_| "file".to_string()),
            store_path: env::var("SHIPTRACK_STORE_PATH").ok(),
            update_interval_secs: parse_var("SHIPTRACK_UPDATE_INTERVAL_SECS")?,
            webhook_id: env::var("SHIPTRACK_WEBHOOK_ID")
                .ok()
                .filter(|id| !id.is_empty()),
            bind_addr: env::var("SHIPTRACK_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            tracking_numbers: env::var("SHIPTRACK_TRACKING_NUMBERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_level: env::var("SHIPTRACK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Build and validate the tracker configuration
    fn tracker_config(&self) -> Result<TrackerConfig> {
        let mut config = TrackerConfig::new(self.api_key.clone());

        if let Some(ref url) = self.api_base_url {
            config.api = config.api.with_base_url(url.clone());
        }
        if let Some(timeout) = self.http_timeout_secs {
            config.api.timeout_secs = timeout;
        }

        config.store = match self.store_type.as_str() {
            "memory" => StoreConfig::Memory,
            "file" => match self.store_path {
                Some(ref path) => StoreConfig::File { path: path.clone() },
                None => anyhow::bail!(
                    "SHIPTRACK_STORE_PATH is required when SHIPTRACK_STORE_TYPE=file. \
                    Set it via: export SHIPTRACK_STORE_PATH=/var/lib/shiptrack/tracked.json"
                ),
            },
            other => anyhow::bail!(
                "SHIPTRACK_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        if let Some(interval) = self.update_interval_secs {
            config.coordinator.update_interval_secs = interval;
        }
        config.webhook = self.webhook_id.clone().map(|webhook_id| WebhookConfig { webhook_id });
        config.tracking_numbers = self.tracking_numbers.clone();

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "SHIPTRACK_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn parse_var(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} must be a positive integer. Got: {}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Failure of [`run_daemon`], tagged with the exit code it maps to
struct DaemonError {
    code: ShiptrackExitCode,
    error: anyhow::Error,
}

impl DaemonError {
    fn config(error: impl Into<anyhow::Error>) -> Self {
        Self {
            code: ShiptrackExitCode::ConfigError,
            error: error.into(),
        }
    }

    fn runtime(error: impl Into<anyhow::Error>) -> Self {
        Self {
            code: ShiptrackExitCode::RuntimeError,
            error: error.into(),
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ShiptrackExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return ShiptrackExitCode::ConfigError.into();
        }
    };

    let tracker_config = match config.tracker_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return ShiptrackExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ShiptrackExitCode::ConfigError.into();
    }

    info!("Starting shiptrackd daemon");
    info!(
        "Configuration loaded: {} seed tracking number(s), webhook {}",
        tracker_config.tracking_numbers.len(),
        if tracker_config.webhook.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ShiptrackExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(tracker_config, config.bind_addr).await {
            Ok(()) => ShiptrackExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e.error);
                e.code
            }
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: TrackerConfig, bind_addr: String) -> Result<(), DaemonError> {
    let backend = Ship24Backend::from_config(&config.api).map_err(DaemonError::config)?;

    match backend.verify_credentials().await {
        Ok(()) => info!("Ship24 API key verified"),
        Err(e) if e.failure_kind() == FailureKind::Auth => {
            return Err(DaemonError::config(anyhow::anyhow!(
                "Ship24 rejected the API key: {}",
                e
            )));
        }
        // Unreachable API at startup is not fatal; polling retries it
        Err(e) => warn!("Could not verify Ship24 API key: {}", e),
    }

    let store = shiptrack_core::open_store(&config.store)
        .await
        .map_err(DaemonError::config)?;

    let (coordinator, events) = UpdateCoordinator::new(Arc::new(backend), store, &config)
        .map_err(DaemonError::config)?;
    let coordinator = Arc::new(coordinator);

    for tracking_number in &config.tracking_numbers {
        match coordinator.add_tracking(tracking_number, None).await {
            Ok(outcome) => debug!("Seed {}: {:?}", tracking_number, outcome),
            Err(e) if e.failure_kind() == FailureKind::Auth => {
                return Err(DaemonError::config(anyhow::anyhow!(
                    "Ship24 rejected the API key: {}",
                    e
                )));
            }
            Err(e) => warn!("Could not track {}: {}", tracking_number, e),
        }
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| DaemonError::config(anyhow::anyhow!("Failed to bind {}: {}", bind_addr, e)))?;

    tokio::spawn(log_events(events));

    let (coordinator_tx, coordinator_rx) = oneshot::channel();
    let (stopped_tx, stopped_rx) = oneshot::channel();
    let runner = Arc::clone(&coordinator);
    let coordinator_task = tokio::spawn(async move {
        let result = runner.run_with_shutdown(Some(coordinator_rx)).await;
        let _ = stopped_tx.send(());
        result
    });

    let state = AppState::new(
        Arc::clone(&coordinator),
        config.webhook.as_ref().map(|w| w.webhook_id.clone()),
    );

    info!(
        "Polling every {}s",
        coordinator.update_interval().as_secs()
    );

    let cause = Arc::new(std::sync::Mutex::new(None));
    let shutdown = {
        let cause = Arc::clone(&cause);
        async move {
            let stopped_by = until_shutdown(wait_for_shutdown(), stopped_rx).await;
            if let Ok(mut slot) = cause.lock() {
                *slot = Some(stopped_by);
            }
        }
    };

    let served = shiptrack_http::serve(listener, state, shutdown).await;

    let cause = cause.lock().ok().and_then(|slot| *slot);
    match cause {
        Some(ShutdownCause::Signal(name)) => info!("Received shutdown signal: {}", name),
        Some(ShutdownCause::CoordinatorStopped) => {
            error!("Coordinator stopped, shutting down HTTP server")
        }
        Some(ShutdownCause::SignalFailed) | None => {}
    }
    info!("Shutting down daemon");

    // The coordinator may have already stopped on its own error
    let _ = coordinator_tx.send(());
    let coordinator_result = coordinator_task.await.map_err(DaemonError::runtime)?;

    served.map_err(DaemonError::runtime)?;
    coordinator_result.map_err(DaemonError::runtime)?;
    if cause == Some(ShutdownCause::CoordinatorStopped) {
        return Err(DaemonError::runtime(anyhow::anyhow!(
            "Coordinator stopped before any shutdown signal"
        )));
    }

    Ok(())
}

/// What ended the serve loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownCause {
    Signal(&'static str),
    SignalFailed,
    CoordinatorStopped,
}

/// Wait for a shutdown signal or for the coordinator task to end
///
/// A dropped `coordinator_stopped` sender counts as stopped. A signal
/// handler error is logged and also ends the wait.
async fn until_shutdown(
    signal: impl std::future::Future<Output = Result<&'static str>>,
    coordinator_stopped: oneshot::Receiver<()>,
) -> ShutdownCause {
    tokio::select! {
        received = signal => match received {
            Ok(name) => ShutdownCause::Signal(name),
            Err(e) => {
                error!("Shutdown signal error: {}", e);
                ShutdownCause::SignalFailed
            }
        },
        _ = coordinator_stopped => ShutdownCause::CoordinatorStopped,
    }
}

/// Log coordinator events
async fn log_events(events: tokio::sync::mpsc::Receiver<CoordinatorEvent>) {
    let mut stream = ReceiverStream::new(events);
    while let Some(event) = stream.next().await {
        match event {
            CoordinatorEvent::RefreshFailed {
                tracking_number,
                error,
                ..
            } => warn!("Refresh of {} failed: {}", tracking_number, error),
            CoordinatorEvent::Stopped { reason } => {
                info!("Coordinator stopped: {}", reason);
            }
            other => debug!("Coordinator event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
