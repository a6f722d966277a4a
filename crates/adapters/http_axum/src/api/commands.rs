//! Command handlers: one URL per actuator action.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use hubbridge_app::ports::{RpcSink, StateStore};
use hubbridge_domain::command::CommandRequest;
use hubbridge_domain::datapoint::DatapointWrite;
use hubbridge_domain::receipt::CommandReceipt;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned when a command was accepted.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// What was (or will be) written.
    pub write: DatapointWrite,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_ms: Option<u64>,
}

impl From<CommandReceipt> for CommandResponse {
    fn from(receipt: CommandReceipt) -> Self {
        Self {
            message: receipt.to_string(),
            write: receipt.write,
            deferred_ms: receipt.deferred_ms,
        }
    }
}

/// `GET|POST /api/set/{kind}/{serial}/{channel}/{action}`
pub async fn set<S, R>(
    State(state): State<AppState<S, R>>,
    Path((kind, serial, channel, action)): Path<(String, String, String, String)>,
) -> Result<Json<CommandResponse>, ApiError>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    execute(&state, CommandRequest::new(kind, serial, channel, action)).await
}

/// `GET|POST /api/set/{kind}/{serial}/{channel}/{action}/{value}`
pub async fn set_value<S, R>(
    State(state): State<AppState<S, R>>,
    Path((kind, serial, channel, action, value)): Path<(String, String, String, String, f64)>,
) -> Result<Json<CommandResponse>, ApiError>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    execute(
        &state,
        CommandRequest::new(kind, serial, channel, action).with_value(value),
    )
    .await
}

async fn execute<S, R>(
    state: &AppState<S, R>,
    request: CommandRequest,
) -> Result<Json<CommandResponse>, ApiError>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    let receipt = state.command_service.execute(&request).await?;
    Ok(Json(receipt.into()))
}
