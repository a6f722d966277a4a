//! State store port: the cached hub topology and datapoint values.
//!
//! Reads come from the command path, writes from inbound hub frames.
//! Implementations must serialize access so a reader never observes a
//! half-applied update.

use hubbridge_domain::actuator::Actuator;
use hubbridge_domain::rpc::{DatapointUpdate, RpcResponse};

/// Queryable, updatable actuator state.
pub trait StateStore {
    /// Snapshot of one actuator.
    fn actuator(&self, serial: &str) -> Option<Actuator>;

    /// Snapshot of every actuator.
    fn actuators(&self) -> Vec<Actuator>;

    /// Apply values pushed by the hub, returning the serials that changed.
    fn apply_update(&self, updates: &[DatapointUpdate]) -> Vec<String>;

    /// Apply the result of an RPC call, returning the serials that changed.
    fn apply_response(&self, response: &RpcResponse) -> Vec<String>;
}

impl<T: StateStore> StateStore for std::sync::Arc<T> {
    fn actuator(&self, serial: &str) -> Option<Actuator> {
        (**self).actuator(serial)
    }

    fn actuators(&self) -> Vec<Actuator> {
        (**self).actuators()
    }

    fn apply_update(&self, updates: &[DatapointUpdate]) -> Vec<String> {
        (**self).apply_update(updates)
    }

    fn apply_response(&self, response: &RpcResponse) -> Vec<String> {
        (**self).apply_response(response)
    }
}
