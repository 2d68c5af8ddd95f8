use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::commands::seed::{parse_fixture, seed_store, DEFAULT_FIXTURE};
use crate::cli::utils::connect_store;
use crate::config::AppConfig;
use crate::database::{MemoryStore, Store};
use crate::state::AppState;

pub async fn handle(in_memory: bool, seed: bool, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(port) = port {
        config.api.port = port;
    }
    config.validate().context("invalid configuration")?;
    info!("Starting onboarding API in {:?} mode", config.environment);

    let store: Arc<dyn Store> = if in_memory {
        warn!("Using in-memory storage; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(connect_store(&config).await?)
    };

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.api.port));
    let state = AppState::new(config, store);

    if seed {
        let fixture = parse_fixture(DEFAULT_FIXTURE)?;
        seed_store(&state.store, &state.auth, &fixture).await?;
    }

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Onboarding API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        crate::app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
