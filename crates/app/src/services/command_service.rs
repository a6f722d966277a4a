//! Command service: validates a request and hands it to the dispatcher.

use std::sync::Arc;

use hubbridge_domain::actuator::Actuator;
use hubbridge_domain::command::{CommandRequest, resolve};
use hubbridge_domain::error::BridgeError;
use hubbridge_domain::receipt::CommandReceipt;

use crate::ports::{RpcSink, StateStore};
use crate::services::dispatcher::Dispatcher;

/// Application service behind every inbound command surface.
pub struct CommandService<S, R> {
    store: Arc<S>,
    dispatcher: Dispatcher<S, R>,
}

impl<S, R> CommandService<S, R>
where
    S: StateStore,
    R: RpcSink + Send + Sync + 'static,
{
    /// Create a service reading actuators from `store` and writing to `sink`.
    pub fn new(store: Arc<S>, sink: Arc<R>) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&store), sink),
            store,
        }
    }

    /// Validate, resolve, and dispatch a command.
    ///
    /// Failures are logged here and returned; they never take the process
    /// down.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Command`] for requests rejected by the command
    /// table or store, and the sink's error when the write cannot be sent.
    #[tracing::instrument(
        skip(self, request),
        fields(kind = %request.kind, serial = %request.serial, channel = %request.channel, action = %request.action)
    )]
    pub async fn execute(&self, request: &CommandRequest) -> Result<CommandReceipt, BridgeError> {
        let result = self.run(request).await;
        match &result {
            Ok(receipt) => tracing::info!(write = %receipt.write, "{receipt}"),
            Err(err) => tracing::error!(error = %err, "command failed"),
        }
        result
    }

    async fn run(&self, request: &CommandRequest) -> Result<CommandReceipt, BridgeError> {
        let command = resolve(request, |serial| self.store.actuator(serial))?;
        let resolution = self
            .dispatcher
            .dispatch(&command.target, command.value, command.caller_value)
            .await?;
        Ok(CommandReceipt::new(&command, &resolution))
    }

    /// Look up one actuator.
    pub fn actuator(&self, serial: &str) -> Option<Actuator> {
        self.store.actuator(serial)
    }

    /// Every known actuator.
    pub fn actuators(&self) -> Vec<Actuator> {
        self.store.actuators()
    }
}
