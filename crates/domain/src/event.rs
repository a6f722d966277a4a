//! Status events: published whenever the known hub state changes.

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, now};

/// What triggered a status event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// The hub pushed datapoint updates.
    Update,
    /// An RPC result was applied.
    Response,
    /// The session subscribed to hub updates.
    Subscribed,
    /// The session lost its connection.
    Disconnected,
}

impl StatusKind {
    /// Wire name, as serialized.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Response => "response",
            Self::Subscribed => "subscribed",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Notification for status subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: StatusKind,
    /// Actuators whose state changed.
    pub serials: Vec<String>,
    pub timestamp: Timestamp,
}

impl StatusEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(kind: StatusKind, serials: Vec<String>) -> Self {
        Self {
            kind,
            serials,
            timestamp: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_kind_in_snake_case() {
        let event = StatusEvent::new(StatusKind::Update, vec!["S1".to_string()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "update");
        assert_eq!(json["serials"], serde_json::json!(["S1"]));
    }

    #[test]
    fn should_name_kind_like_its_serialized_form() {
        for kind in [
            StatusKind::Update,
            StatusKind::Response,
            StatusKind::Subscribed,
            StatusKind::Disconnected,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
