use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use audit_gate::audit::{FileAuditSink, SharedAuditSink};
use audit_gate::clock::SystemClock;
use audit_gate::config::LogFormat;
use audit_gate::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Logging comes up before config errors are reported, so read the
    // format leniently here and let Config::from_env reject bad values.
    let config = Config::from_env();
    let log_format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    init_tracing(log_format);

    info!("Starting audit gate v{}", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Operational logs go to stderr; the audit trail has its own file.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        window = %format!("{:02}:00-{:02}:00", config.allowed_start_hour, config.allowed_end_hour),
        audit_log = %config.audit_log_path().display(),
        audit_format = %config.audit_log_format,
        "Configuration loaded"
    );

    // Open the audit log up front so a bad path fails at startup
    let sink = FileAuditSink::open(config.audit_log_path(), config.audit_log_format).map_err(|e| {
        error!("Failed to open audit log: {e}");
        exitcode::CANTCREAT
    })?;
    let sink: SharedAuditSink = Arc::new(sink);

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    } else {
        info!("Metrics disabled (METRICS_PORT=0)");
    }

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    let state = AppState::new(config, sink, Arc::new(SystemClock)).map_err(|e| {
        error!("Invalid access policy: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state).map_err(|e| {
        error!("Failed to build router: {e}");
        exitcode::CONFIG
    })?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("Endpoints:");
    info!("  GET  /, /home  - Greeting (time-restricted)");
    info!("  GET  /whoami   - Resolved caller (time-restricted)");
    info!("  GET  /health   - Health check");
    info!("  GET  /ready    - Readiness check");

    // Peer addresses feed the audit record when no forwarding header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}
