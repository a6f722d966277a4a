//! Axum router assembly.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use hubbridge_app::ports::{RpcSink, StateStore};
use hubbridge_domain::session::SessionState;

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Mounts API routes under `/api` next to `/health`, with a [`TraceLayer`]
/// logging each request at `DEBUG`.
pub fn build<S, R>(state: AppState<S, R>) -> Router
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check::<S, R>))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    session: SessionState,
}

async fn health_check<S, R>(State(state): State<AppState<S, R>>) -> Json<Health>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    Json(Health {
        status: "ok",
        session: state.session_state(),
    })
}
