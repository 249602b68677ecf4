//! Pyörävahti Server - REST API for lost, stolen and found bikes
//!
//! Serves report intake, bike listings, match suggestions and duplicate-aware
//! search over HTTP. Uses PostgreSQL when `DATABASE_URL` is set and an
//! in-memory store otherwise.

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use pyoravahti_server::{create_router_with_state, AppState, Config};

/// How often expired report rate limit windows are dropped
const LIMITER_PURGE_INTERVAL: Duration = Duration::from_secs(300);

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pyoravahti_server=info,tower_http=info")),
        )
        .init();

    tracing::info!("Starting Pyörävahti server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let addr = config.socket_addr();
    tracing::info!(
        addr = %addr,
        admin_protected = config.admin_token.is_some(),
        tori_adapter = config.enable_tori_adapter,
        upload_dir = %config.upload_dir.display(),
        "Loaded configuration"
    );

    let state = AppState::connect(config).await?;
    tracing::info!(store = state.store.backend(), "Bike store ready");

    let limiter = state.report_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            limiter.purge_expired();
        }
    });

    let app = create_router_with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API docs at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
