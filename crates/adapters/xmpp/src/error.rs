//! XMPP adapter error types.

use hubbridge_domain::error::BridgeError;

/// Errors specific to the hub session.
#[derive(Debug, thiserror::Error)]
pub enum XmppError {
    /// Socket-level failure.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML from the hub.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The hub rejected the credentials or offers no usable mechanism.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The hub sent something the handshake did not expect.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The hub closed the stream.
    #[error("stream closed by the hub")]
    Closed,

    /// The hub did not answer a keepalive ping before the next one was due.
    #[error("no ping reply from the hub within {0:?}")]
    PingTimeout(std::time::Duration),

    /// Writes arrive faster than the session can send them.
    #[error("outbound queue is full")]
    QueueFull,
}

impl From<quick_xml::events::attributes::AttrError> for XmppError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(err.into())
    }
}

impl From<XmppError> for BridgeError {
    fn from(err: XmppError) -> Self {
        BridgeError::Transport(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_auth_error() {
        let err = XmppError::Auth("not-authorized".to_string());
        assert_eq!(err.to_string(), "authentication failed: not-authorized");
    }

    #[test]
    fn should_display_ping_timeout() {
        let err = XmppError::PingTimeout(std::time::Duration::from_secs(10));
        assert_eq!(err.to_string(), "no ping reply from the hub within 10s");
    }

    #[test]
    fn should_convert_to_transport_error() {
        let err: BridgeError = XmppError::Closed.into();
        assert!(matches!(err, BridgeError::Transport(_)));
    }
}
