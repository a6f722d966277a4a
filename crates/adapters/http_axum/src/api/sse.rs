//! Status events as server-sent events.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt};

use hubbridge_app::ports::{RpcSink, StateStore};
use hubbridge_domain::event::StatusEvent;

use crate::state::AppState;

/// `GET /api/events/stream`
///
/// One SSE frame per [`StatusEvent`], named after its kind (`update`,
/// `response`, `subscribed`, `disconnected`) with the JSON event as data.
/// Clients that fall behind skip the events they missed.
pub async fn stream<S, R>(
    State(state): State<AppState<S, R>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: StateStore + Send + Sync + 'static,
    R: RpcSink + Send + Sync + 'static,
{
    let events = BroadcastStream::new(state.event_bus.subscribe()).filter_map(|received| {
        match received {
            Ok(event) => to_frame(&event).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "status stream client lagged");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_frame(event: &StatusEvent) -> Option<Event> {
    match Event::default().event(event.kind.as_str()).json_data(event) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::warn!(error = %err, "status event not serializable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubbridge_domain::event::StatusKind;

    #[test]
    fn should_name_frame_after_event_kind() {
        let event = StatusEvent::new(StatusKind::Update, vec!["ABB700D12345".to_string()]);
        let frame = to_frame(&event).unwrap();
        let rendered = format!("{frame:?}");
        assert!(rendered.contains("update"));
        assert!(rendered.contains("ABB700D12345"));
    }
}
