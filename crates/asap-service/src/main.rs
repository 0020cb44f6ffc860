//! ASAP Service
//!
//! HTTP service that verifies ASAP bearer tokens on `/v1/claims` and echoes
//! the verified claims back. Doubles as a reference deployment of the axum
//! middleware.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing (text or JSON)
//! 2. Load configuration from environment
//! 3. Install the Prometheus recorder
//! 4. Build the authenticator and start the key cache sweeper
//! 5. Serve until SIGINT/SIGTERM, then stop the sweeper

use asap_core::keys::{KeyCache, DEFAULT_SWEEP_INTERVAL};
use asap_service::config::Config;
use asap_service::observability::init_metrics_recorder;
use asap_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "asap_service=debug,asap_core=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    // Config is read before tracing starts; errors are logged once it is up
    let log_json = config.as_ref().is_ok_and(|c| c.log_json);
    init_tracing(log_json);

    info!("Starting ASAP Service");

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        audience = %config.authenticator.audience,
        auth_mode = %config.auth_mode,
        authorized_issuers = config.authorized_issuers.len(),
        insecure_mode = config.authenticator.insecure_mode,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let key_cache = Arc::new(KeyCache::default());
    let state = AppState::new(&config, Arc::clone(&key_cache)).map_err(|e| {
        error!("Failed to build authenticator: {}", e);
        e
    })?;

    let cancel_token = CancellationToken::new();
    let sweeper = Arc::clone(&key_cache).spawn_sweeper(DEFAULT_SWEEP_INTERVAL, cancel_token.clone());

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("ASAP Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel_token.cancel();
    if let Err(e) = sweeper.await {
        error!(error = %e, "Key cache sweeper task failed");
    }

    info!("ASAP Service shutdown complete");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
