//! # hubbridged: hub bridge daemon
//!
//! Composition root that wires the hub session and the HTTP surface
//! together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Seed the in-memory store with configured scenes
//! - Spawn the hub session and hand its handle to the command service
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hubbridge_adapter_http_axum::state::AppState;
use hubbridge_adapter_xmpp::{HubSession, TcpConnector};
use hubbridge_app::event_bus::InProcessEventBus;
use hubbridge_app::services::command_service::CommandService;
use hubbridge_app::state_store::MemoryStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // State
    let store = Arc::new(MemoryStore::new());
    for scene in &config.scenes {
        store.seed(scene.to_actuator());
    }
    tracing::info!(scenes = config.scenes.len(), "store seeded");

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));

    // Hub session
    let (session, handle) = HubSession::new(
        config.hub.clone(),
        Arc::clone(&store),
        Arc::clone(&event_bus),
    );
    let session_state = handle.watch();
    let session_task = session.start(TcpConnector::new(config.hub.clone()));

    // HTTP
    let command_service = CommandService::new(store, Arc::new(handle));
    let state = AppState::new(command_service, event_bus, session_state);
    let app = hubbridge_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, hub = %config.hub.host, "hubbridged listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    session_task.abort();
    tracing::info!("hubbridged stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
