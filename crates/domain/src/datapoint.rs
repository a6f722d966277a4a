//! Datapoints: input (`idp*`), output (`odp*`) and parameter (`pm*`) registers.
//!
//! Inputs are written to command a device, outputs reflect what it reports.
//! An input and the output sharing its number describe the same quantity,
//! so the read side of `idp0000` is `odp0000`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Movement status of a shutter channel: 0/1 stationary, 2 up, 3 down.
pub const MOVEMENT_STATUS: &str = "odp0000";

/// Input that stops a moving shutter when set to `1`.
pub const STOP: &str = "idp0001";

/// On/off state reported by thermostat-class devices.
pub const THERMOSTAT_SWITCH_STATE: &str = "odp0006";

/// Current set-point reported by thermostat-class devices.
pub const THERMOSTAT_SET_POINT: &str = "odp0002";

/// Motor delay parameter, in milliseconds.
pub const MOTOR_DELAY: &str = "pm0006";

/// Current value of a datapoint or parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatapointValue {
    Number(f64),
    Text(String),
}

impl DatapointValue {
    /// Interpret a value as reported by the hub.
    ///
    /// Anything that reads as a finite number becomes [`Number`](Self::Number),
    /// the rest is kept verbatim.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Whether the value reads as a non-zero number.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.as_f64().is_some_and(|number| number != 0.0)
    }
}

impl From<f64> for DatapointValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DatapointValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for DatapointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                #[allow(clippy::cast_possible_truncation)]
                let integral = *number as i64;
                write!(f, "{integral}")
            }
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Swap the `i`/`o` prefix of an I/O datapoint key (`idp0000` <-> `odp0000`).
///
/// Returns `None` for parameters and malformed keys.
#[must_use]
pub fn counterpart(key: &str) -> Option<String> {
    if !is_io_key(key) {
        return None;
    }
    let (prefix, number) = key.split_at(3);
    let swapped = if prefix == "idp" { "odp" } else { "idp" };
    Some(format!("{swapped}{number}"))
}

/// Whether `key` matches `[io]dp[0-9A-F]{4}`.
#[must_use]
pub fn is_io_key(key: &str) -> bool {
    (key.starts_with("idp") || key.starts_with("odp")) && has_hex_suffix(key, 3)
}

/// Whether `key` matches `pm[0-9A-F]{4}`.
#[must_use]
pub fn is_parameter_key(key: &str) -> bool {
    key.starts_with("pm") && has_hex_suffix(key, 2)
}

fn has_hex_suffix(key: &str, prefix_len: usize) -> bool {
    let suffix = &key.as_bytes()[prefix_len..];
    suffix.len() == 4
        && suffix
            .iter()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
}

/// Fully-qualified address of one datapoint on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatapointTarget {
    pub serial: String,
    pub channel: String,
    pub datapoint: String,
}

impl DatapointTarget {
    /// Build a target from its three parts.
    pub fn new(
        serial: impl Into<String>,
        channel: impl Into<String>,
        datapoint: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            channel: channel.into(),
            datapoint: datapoint.into(),
        }
    }

    /// The same channel, another datapoint.
    #[must_use]
    pub fn with_datapoint(&self, datapoint: impl Into<String>) -> Self {
        Self {
            serial: self.serial.clone(),
            channel: self.channel.clone(),
            datapoint: datapoint.into(),
        }
    }

    /// Attach a value, producing the write to send.
    #[must_use]
    pub fn write(self, value: impl Into<DatapointValue>) -> DatapointWrite {
        DatapointWrite {
            target: self,
            value: value.into(),
        }
    }
}

impl fmt::Display for DatapointTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.serial, self.channel, self.datapoint)
    }
}

/// A concrete value to write to one datapoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointWrite {
    #[serde(flatten)]
    pub target: DatapointTarget,
    pub value: DatapointValue,
}

impl fmt::Display for DatapointWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.value)
    }
}
