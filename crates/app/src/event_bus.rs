//! Status bus fanning hub changes out to every listener in the process.

use std::future::Future;

use tokio::sync::broadcast;

use hubbridge_domain::error::BridgeError;
use hubbridge_domain::event::StatusEvent;

use crate::ports::StatusPublisher;

/// [`StatusPublisher`] over a tokio [`broadcast`] channel.
///
/// Slow listeners lose the oldest events once `capacity` is exceeded; the
/// session never waits on them.
pub struct InProcessEventBus {
    sender: broadcast::Sender<StatusEvent>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Listen for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn listeners(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl StatusPublisher for InProcessEventBus {
    fn publish(&self, event: StatusEvent) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let kind = event.kind.as_str();
        match self.sender.send(event) {
            Ok(listeners) => tracing::debug!(kind, listeners, "status published"),
            Err(_) => tracing::trace!(kind, "status dropped, nobody listening"),
        }
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubbridge_domain::event::StatusKind;
    use tokio::sync::broadcast::error::RecvError;

    fn update(serial: &str) -> StatusEvent {
        StatusEvent::new(StatusKind::Update, vec![serial.to_string()])
    }

    #[tokio::test]
    async fn should_fan_out_to_every_listener() {
        let bus = InProcessEventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.listeners(), 2);

        let event = update("ABB700D12345");
        bus.publish(event.clone()).await.unwrap();

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn should_accept_events_without_listeners() {
        let bus = InProcessEventBus::new(8);
        assert_eq!(bus.listeners(), 0);
        assert!(
            bus.publish(StatusEvent::new(StatusKind::Disconnected, vec![]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn should_only_see_events_after_subscribing() {
        let bus = InProcessEventBus::new(8);
        bus.publish(update("S1")).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(StatusEvent::new(StatusKind::Subscribed, vec![]))
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().kind, StatusKind::Subscribed);
    }

    #[tokio::test]
    async fn should_report_lag_to_slow_listener() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();
        for serial in ["S1", "S2", "S3"] {
            bus.publish(update(serial)).await.unwrap();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().serials, vec!["S2".to_string()]);
    }
}
