//! AirSense - airborne sensor capture and liability settlement agents
//!
//! # Usage
//!
//! ```bash
//! # Capture from the sensor board
//! airsense capture --device /dev/ttyUSB0 --baud 115200
//!
//! # Replay a recorded byte stream
//! cat flight.bin | airsense capture --stdin
//!
//! # Settlement agent
//! airsense settle --model QmModel --token 0xToken
//!
//! # Print the effective configuration
//! airsense --config airsense.toml print-config
//! ```
//!
//! # Environment Variables
//!
//! - `AIRSENSE_CONFIG`: Path to the TOML config file
//! - `AIRSENSE_LOG_JSON`: Emit JSON log lines
//! - `RUST_LOG`: Logging level (default: info)
//!
//! A `.env` file in the working directory is loaded first.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use airsense::acquisition::{stdin_source, ByteSource, DeviceSource};
use airsense::api::{self, CaptureApiState, SettlementApiState};
use airsense::capture::{BatchFlusher, CaptureActor};
use airsense::clients::retry::RetryPolicy;
use airsense::clients::{
    http_client, HttpLiabilityClient, HttpPublisher, IpfsClient, JsonRpcChainClient,
};
use airsense::config::AgentConfig;
use airsense::settlement::{
    BidTerms, SettlementActor, SettlementAgent, SettlementDispatcher, SettlementSlot,
};
use airsense::storage::BatchFileWriter;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "airsense")]
#[command(about = "Airborne sensor capture and liability settlement agents")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file (default: $AIRSENSE_CONFIG, then ./airsense.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "AIRSENSE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Run the telemetry capture agent
    Capture(CaptureArgs),
    /// Run the auction and settlement agent
    Settle(SettleArgs),
    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Serial device carrying the sensor stream
    #[arg(long, env = "AIRSENSE_DEVICE")]
    device: Option<PathBuf>,

    /// Line speed configured on the device
    #[arg(long, env = "AIRSENSE_BAUD")]
    baud: Option<u32>,

    /// Read raw sensor bytes from stdin instead of the device
    /// Example: cat flight.bin | airsense capture --stdin
    #[arg(long)]
    stdin: bool,

    /// Directory receiving flushed batch files
    #[arg(long, env = "AIRSENSE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Flush-policy evaluation rate (Hz)
    #[arg(long)]
    poll_rate_hz: Option<f64>,

    /// Event ingress bind address (HOST:PORT)
    #[arg(long, env = "AIRSENSE_CAPTURE_ADDR")]
    listen: Option<String>,
}

#[derive(Args, Debug)]
struct SettleArgs {
    /// Model identifier asks must match
    #[arg(long, env = "AIRSENSE_MODEL")]
    model: Option<String>,

    /// Token identifier asks must match
    #[arg(long, env = "AIRSENSE_TOKEN")]
    token: Option<String>,

    /// Bid validity in blocks
    #[arg(long, env = "AIRSENSE_BID_LIFETIME")]
    bid_lifetime: Option<u64>,

    /// Event ingress bind address (HOST:PORT)
    #[arg(long, env = "AIRSENSE_SETTLEMENT_ADDR")]
    listen: Option<String>,
}

impl CaptureArgs {
    fn apply(&self, config: &mut AgentConfig) {
        let c = &mut config.capture;
        if let Some(ref device) = self.device {
            c.device_path = device.clone();
        }
        if let Some(baud) = self.baud {
            c.baud_rate = baud;
        }
        if let Some(ref dir) = self.data_dir {
            c.data_dir = dir.clone();
        }
        if let Some(hz) = self.poll_rate_hz {
            c.poll_rate_hz = hz;
        }
        if let Some(ref addr) = self.listen {
            c.listen_addr = addr.clone();
        }
    }
}

impl SettleArgs {
    fn apply(&self, config: &mut AgentConfig) {
        let s = &mut config.settlement;
        if let Some(ref model) = self.model {
            s.model = model.clone();
        }
        if let Some(ref token) = self.token {
            s.token = token.clone();
        }
        if let Some(lifetime) = self.bid_lifetime {
            s.bid_lifetime = lifetime;
        }
        if let Some(ref addr) = self.listen {
            s.listen_addr = addr.clone();
        }
    }
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    CaptureLoop,
    SettlementLoop,
    Dispatcher,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::CaptureLoop => write!(f, "CaptureLoop"),
            TaskName::SettlementLoop => write!(f, "SettlementLoop"),
            TaskName::Dispatcher => write!(f, "Dispatcher"),
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

// ============================================================================
// Shared Task Helpers
// ============================================================================

/// Bind the ingress listener.
async fn bind(addr: &str) -> Result<tokio::net::TcpListener> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("✓ Event ingress listening on {}", addr);
    Ok(listener)
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => {
                info!("🔒 Supervisor: Task {} completed", task_name);
                // Any task ending takes the agent down with it
                cancel_token.cancel();
            }
            Ok(Err(e)) => {
                error!("🔒 Supervisor: Task failed with error: {}", e);
                cancel_token.cancel();
                return Err(e);
            }
            Err(e) => {
                error!("🔒 Supervisor: Task panicked: {}", e);
                cancel_token.cancel();
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("🔒 Supervisor: All tasks completed");
    Ok(())
}

// ============================================================================
// Capture Agent
// ============================================================================

async fn run_capture<S: ByteSource>(
    source: S,
    config: &AgentConfig,
    cancel_token: CancellationToken,
) -> Result<()> {
    let http = http_client(config.endpoints.http_timeout_secs)
        .context("Failed to build HTTP client")?;
    let store = Arc::new(IpfsClient::new(http.clone(), &config.endpoints.content_store));
    let publisher = Arc::new(HttpPublisher::new(
        http,
        &config.endpoints.measurements,
        &config.endpoints.bids,
    ));

    info!(data_dir = %config.capture.data_dir.display(), "💾 Batch files");
    info!(content_store = %store.api_url(), "📦 Content store");

    let flusher = BatchFlusher::new(
        BatchFileWriter::new(&config.capture.data_dir),
        store,
        publisher,
    )
    .with_upload_retry(RetryPolicy::with_retries(config.capture.upload_retries));

    let (actor, handle) = CaptureActor::new(
        source,
        flusher,
        config.capture.tick_interval(),
        cancel_token.clone(),
    );

    let listener = bind(&config.capture.listen_addr).await?;
    let app = api::create_capture_app(CaptureApiState { handle });

    let mut task_set = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    task_set.spawn(async move {
        let summary = actor.run().await;
        info!(
            flushes = summary.flushes.len(),
            bytes_read = summary.bytes_read,
            "[CaptureLoop] Finished"
        );
        Ok(TaskName::CaptureLoop)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Settlement Agent
// ============================================================================

async fn run_settlement(config: &AgentConfig, cancel_token: CancellationToken) -> Result<()> {
    config.validate_for_settlement()?;

    let http = http_client(config.endpoints.http_timeout_secs)
        .context("Failed to build HTTP client")?;
    let chain = Arc::new(JsonRpcChainClient::new(http.clone(), &config.endpoints.chain_rpc));
    let liability = Arc::new(HttpLiabilityClient::new(
        http.clone(),
        &config.endpoints.liability_finish,
    ));
    let publisher = Arc::new(HttpPublisher::new(
        http,
        &config.endpoints.measurements,
        &config.endpoints.bids,
    ));

    let slot = Arc::new(SettlementSlot::new());
    let terms = BidTerms {
        model: config.settlement.model.clone(),
        token: config.settlement.token.clone(),
        bid_lifetime: config.settlement.bid_lifetime,
    };
    let agent = SettlementAgent::new(terms, chain, publisher, slot.clone());
    let (actor, handle) = SettlementActor::new(agent, cancel_token.clone());
    let dispatcher = SettlementDispatcher::new(slot.clone(), liability, cancel_token.clone())
        .with_retry(RetryPolicy::with_retries(config.settlement.finish_retries));

    let listener = bind(&config.settlement.listen_addr).await?;
    let app = api::create_settlement_app(SettlementApiState { handle, slot });

    let mut task_set = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    task_set.spawn(async move {
        actor.run().await;
        Ok(TaskName::SettlementLoop)
    });
    task_set.spawn(async move {
        dispatcher.run().await;
        Ok(TaskName::Dispatcher)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Grace period for runtime teardown after the agents stop.
///
/// Device and stdin reads park a blocking-pool thread until the next byte
/// arrives; a silent sensor must not hold the process open.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run() -> Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let mut config = AgentConfig::load(args.config.as_deref())?;
    match &args.command {
        SubCommand::Capture(capture) => capture.apply(&mut config),
        SubCommand::Settle(settle) => settle.apply(&mut config),
        SubCommand::PrintConfig => {}
    }
    config.validate()?;

    if let SubCommand::PrintConfig = args.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  AirSense - Airborne Sensor Capture & Settlement");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    match args.command {
        SubCommand::Capture(capture) if capture.stdin => {
            info!("📥 Input: stdin (raw sensor bytes)");
            run_capture(stdin_source(), &config, cancel_token).await?;
        }
        SubCommand::Capture(_) => {
            info!(
                "📥 Input: {} @ {} baud",
                config.capture.device_path.display(),
                config.capture.baud_rate
            );
            let source =
                DeviceSource::open(&config.capture.device_path, config.capture.baud_rate).await?;
            run_capture(source, &config, cancel_token).await?;
        }
        SubCommand::Settle(_) => {
            run_settlement(&config, cancel_token).await?;
        }
        SubCommand::PrintConfig => {}
    }

    info!("✓ AirSense shutdown complete");
    Ok(())
}
