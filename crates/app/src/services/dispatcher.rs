//! Dispatcher: turns a value spec into a write and hands it to the session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use hubbridge_domain::command::ValueSpec;
use hubbridge_domain::datapoint::{DatapointTarget, DatapointWrite};
use hubbridge_domain::error::BridgeError;
use hubbridge_domain::transform::{Resolution, transform};

use crate::ports::{RpcSink, StateStore};

type ChannelKey = (String, String);

/// Resolves symbolic values against the store and sends the result.
///
/// Deferred writes (pulse stops) run as tokio tasks keyed by
/// `(serial, channel)`. Arming a new one for the same channel aborts the
/// pending task, so at most one stop is outstanding per channel.
pub struct Dispatcher<S, R> {
    store: Arc<S>,
    sink: Arc<R>,
    pending: Mutex<HashMap<ChannelKey, JoinHandle<()>>>,
}

impl<S, R> Dispatcher<S, R>
where
    S: StateStore,
    R: RpcSink + Send + Sync + 'static,
{
    /// Create a dispatcher reading from `store` and writing to `sink`.
    pub fn new(store: Arc<S>, sink: Arc<R>) -> Self {
        Self {
            store,
            sink,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve `spec` for `target` and send (or schedule) the write.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Command`] when the value cannot be resolved,
    /// or the sink's error for immediate writes. Failures of a deferred
    /// write surface only in the logs.
    #[tracing::instrument(skip(self, target), fields(target = %target))]
    pub async fn dispatch(
        &self,
        target: &DatapointTarget,
        spec: ValueSpec,
        caller_value: Option<f64>,
    ) -> Result<Resolution, BridgeError> {
        let actuator = self.store.actuator(&target.serial);
        let resolution = transform(target, spec, caller_value, actuator.as_ref())?;

        match &resolution {
            Resolution::Immediate(write) => {
                self.sink.set_datapoint(write.clone()).await?;
            }
            Resolution::Deferred { delay, write } => {
                self.arm(*delay, write.clone());
            }
        }

        Ok(resolution)
    }

    /// Number of deferred writes still waiting to fire.
    pub fn pending(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, handle| !handle.is_finished());
        pending.len()
    }

    fn arm(&self, delay: std::time::Duration, write: DatapointWrite) {
        let key = (write.target.serial.clone(), write.target.channel.clone());
        let sink = Arc::clone(&self.sink);
        tracing::debug!(
            serial = %key.0,
            channel = %key.1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "stop scheduled"
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = sink.set_datapoint(write).await {
                tracing::error!(error = %err, "scheduled stop failed");
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = pending.insert(key, handle) {
            previous.abort();
        }
    }
}

impl<S, R> Drop for Dispatcher<S, R> {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }
}
