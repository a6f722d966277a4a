//! JSON handlers for actuators.

use axum::Json;
use axum::extract::{Path, State};

use hubbridge_app::ports::{RpcSink, StateStore};
use hubbridge_domain::actuator::Actuator;
use hubbridge_domain::error::CommandError;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/actuators`
pub async fn list<S, R>(State(state): State<AppState<S, R>>) -> Json<Vec<Actuator>>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    Json(state.command_service.actuators())
}

/// `GET /api/actuators/{serial}`
pub async fn get<S, R>(
    State(state): State<AppState<S, R>>,
    Path(serial): Path<String>,
) -> Result<Json<Actuator>, ApiError>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    state
        .command_service
        .actuator(&serial)
        .map(Json)
        .ok_or_else(|| CommandError::UnknownActuator { serial }.into())
}
