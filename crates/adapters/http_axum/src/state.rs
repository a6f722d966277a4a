//! Shared application state for axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use hubbridge_app::event_bus::InProcessEventBus;
use hubbridge_app::ports::{RpcSink, StateStore};
use hubbridge_app::services::command_service::CommandService;
use hubbridge_domain::session::SessionState;

/// Application state shared across all axum handlers.
///
/// Generic over the state store and RPC sink to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<S, R> {
    /// Validates and dispatches commands.
    pub command_service: Arc<CommandService<S, R>>,
    /// Status events for the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
    /// Current hub session state.
    pub session: watch::Receiver<SessionState>,
}

impl<S, R> Clone for AppState<S, R> {
    fn clone(&self) -> Self {
        Self {
            command_service: Arc::clone(&self.command_service),
            event_bus: Arc::clone(&self.event_bus),
            session: self.session.clone(),
        }
    }
}

impl<S, R> AppState<S, R>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    /// Create a new application state.
    pub fn new(
        command_service: CommandService<S, R>,
        event_bus: Arc<InProcessEventBus>,
        session: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            command_service: Arc::new(command_service),
            event_bus,
            session,
        }
    }

    /// Current hub session state.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        *self.session.borrow()
    }
}
