//! Session state: lifecycle of the single connection to the hub.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the hub session is in its lifecycle.
///
/// `Disconnected → Connecting → Online → Subscribed`, and back to
/// `Disconnected` when the transport fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Online,
    Subscribed,
}

impl SessionState {
    /// Whether writes can be sent.
    #[must_use]
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online | Self::Subscribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Online => "online",
            Self::Subscribed => "subscribed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
    }

    #[test]
    fn should_accept_writes_only_when_online() {
        assert!(!SessionState::Disconnected.is_online());
        assert!(!SessionState::Connecting.is_online());
        assert!(SessionState::Online.is_online());
        assert!(SessionState::Subscribed.is_online());
    }

    #[test]
    fn should_display_lowercase_variant_name() {
        assert_eq!(SessionState::Subscribed.to_string(), "subscribed");
    }
}
