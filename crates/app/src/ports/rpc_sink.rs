//! RPC port: the outbound half of the hub session.

use std::future::Future;

use hubbridge_domain::datapoint::DatapointWrite;
use hubbridge_domain::error::BridgeError;

/// Sends datapoint writes to the hub.
///
/// Sends are fire-and-forget: success means the write was handed to the
/// session, not that the hub acknowledged it.
pub trait RpcSink {
    /// Queue a `setDatapoint` call.
    fn set_datapoint(
        &self,
        write: DatapointWrite,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: RpcSink + Send + Sync> RpcSink for std::sync::Arc<T> {
    fn set_datapoint(
        &self,
        write: DatapointWrite,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).set_datapoint(write)
    }
}
