//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`BridgeError`] at port boundaries.

/// Why a command request was rejected.
///
/// The `Display` output is the human-readable message returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The requested actuator type is not in the command table.
    #[error("unknown actuator type '{kind}'")]
    UnknownType { kind: String },

    /// The actuator type exists but does not support the action.
    #[error("unknown action '{action}' for actuator type '{kind}'")]
    UnknownAction { kind: String, action: String },

    /// No actuator with this serial number is known.
    #[error("unknown actuator '{serial}'")]
    UnknownActuator { serial: String },

    /// The actuator's hardware type is not valid for the requested type.
    #[error("actuator '{serial}' ({name}) is not of type '{kind}'")]
    DeviceMismatch {
        serial: String,
        name: String,
        kind: String,
    },

    /// The action writes a caller-supplied value but none was given.
    #[error("a value is required to write {datapoint}")]
    MissingValue { datapoint: String },

    /// The caller-supplied value is NaN or infinite.
    #[error("value for {datapoint} must be a finite number")]
    InvalidValue { datapoint: String },

    /// The action is relative to a current value the hub never reported.
    #[error("no current value for {serial}/{channel}/{datapoint}")]
    MissingState {
        serial: String,
        channel: String,
        datapoint: String,
    },
}

impl CommandError {
    /// Whether the error is about an actuator that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownActuator { .. })
    }
}

/// Top-level error crossing port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A command request failed validation or resolution.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The hub session is not connected, so nothing can be sent.
    #[error("hub session is not online")]
    SessionUnavailable,

    /// An error reported by the transport or another adapter.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
