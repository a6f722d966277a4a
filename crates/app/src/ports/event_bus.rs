//! Status port: publish/subscribe for hub state changes.

use std::future::Future;

use hubbridge_domain::error::BridgeError;
use hubbridge_domain::event::StatusEvent;

/// Publishes status events to interested subscribers.
pub trait StatusPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: StatusEvent) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

impl<T: StatusPublisher + Send + Sync> StatusPublisher for std::sync::Arc<T> {
    fn publish(&self, event: StatusEvent) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).publish(event)
    }
}
