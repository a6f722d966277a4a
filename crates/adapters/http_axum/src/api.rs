//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod actuators;
#[allow(clippy::missing_errors_doc)]
pub mod commands;
pub mod sse;

use axum::Router;
use axum::routing::get;

use hubbridge_app::ports::{RpcSink, StateStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, R>() -> Router<AppState<S, R>>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    Router::new()
        // Actuators
        .route("/actuators", get(actuators::list::<S, R>))
        .route("/actuators/{serial}", get(actuators::get::<S, R>))
        // Commands, reachable with GET so that plain links work
        .route(
            "/set/{kind}/{serial}/{channel}/{action}",
            get(commands::set::<S, R>).post(commands::set::<S, R>),
        )
        .route(
            "/set/{kind}/{serial}/{channel}/{action}/{value}",
            get(commands::set_value::<S, R>).post(commands::set_value::<S, R>),
        )
        // Status events
        .route("/events/stream", get(sse::stream::<S, R>))
}
