//! Records decoded from hub traffic.

use serde::{Deserialize, Serialize};

use crate::actuator::Actuator;
use crate::datapoint::DatapointValue;

/// One datapoint value pushed by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointUpdate {
    pub serial: String,
    /// `None` for device-wide parameters.
    pub channel: Option<String>,
    pub datapoint: String,
    pub value: DatapointValue,
}

/// Result of an RPC call made to the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    /// A full project document (answer to a refresh).
    Project(Vec<Actuator>),
    /// Any other string result, such as the `OK` of a datapoint write.
    Value(String),
    /// The hub rejected the call.
    Fault { code: i64, message: String },
    /// A result without payload.
    Empty,
}
