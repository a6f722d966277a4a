//! Actuator: an addressable physical or virtual endpoint on the bus.
//!
//! Physical actuators are identified by their serial number and carry the
//! hardware type code reported by the hub. Virtual endpoints (scenes) have an
//! identifier of their own but write to a datapoint of the physical actuator
//! owning them, recorded in [`Actuator::serial_number`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::datapoint::DatapointValue;

/// A numbered sub-unit of an actuator with its own datapoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Current values keyed by datapoint (`idp0000`, `odp0000`, `pm0006`, …).
    pub datapoints: BTreeMap<String, DatapointValue>,
}

impl Channel {
    /// Current value of a datapoint.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DatapointValue> {
        self.datapoints.get(key)
    }

    /// Record a value, returning whether it changed.
    pub fn set(&mut self, key: impl Into<String>, value: DatapointValue) -> bool {
        let key = key.into();
        if self.datapoints.get(&key) == Some(&value) {
            return false;
        }
        self.datapoints.insert(key, value);
        true
    }
}

/// An actuator as known to the state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actuator {
    /// Identifier requests use to address the actuator.
    pub serial: String,
    /// Hardware type code (e.g. `B002`); empty for virtual endpoints.
    pub device_id: String,
    /// Display name.
    pub type_name: String,
    /// Serial number writes are sent to. Equal to [`serial`](Self::serial)
    /// for physical actuators, the owning actuator for scenes.
    pub serial_number: String,
    /// Channels keyed by identifier (`ch0000`, …).
    pub channels: BTreeMap<String, Channel>,
    /// Device-wide parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, DatapointValue>,
}

impl Actuator {
    /// Create a physical actuator with no channels yet.
    pub fn new(
        serial: impl Into<String>,
        device_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let serial = serial.into();
        Self {
            serial_number: serial.clone(),
            serial,
            device_id: device_id.into(),
            type_name: type_name.into(),
            channels: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Create a virtual endpoint writing through the actuator `owner`.
    pub fn virtual_endpoint(
        id: impl Into<String>,
        type_name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            serial_number: owner.into(),
            ..Self::new(id, "", type_name)
        }
    }

    /// Whether writes for this actuator go to another serial number.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.serial != self.serial_number
    }

    /// Add a datapoint value to a channel, creating the channel if needed.
    #[must_use]
    pub fn with_datapoint(
        mut self,
        channel: &str,
        key: &str,
        value: impl Into<DatapointValue>,
    ) -> Self {
        self.channel_mut(channel).set(key, value.into());
        self
    }

    /// Add a device-wide parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: &str, value: impl Into<DatapointValue>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    /// Look up a channel.
    #[must_use]
    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Mutable access to a channel, created empty if missing.
    pub fn channel_mut(&mut self, id: &str) -> &mut Channel {
        self.channels.entry(id.to_string()).or_default()
    }

    /// Current value of a channel datapoint.
    #[must_use]
    pub fn datapoint(&self, channel: &str, key: &str) -> Option<&DatapointValue> {
        self.channel(channel).and_then(|ch| ch.get(key))
    }

    /// A parameter value, looked up on the channel first then device-wide.
    #[must_use]
    pub fn parameter(&self, channel: &str, key: &str) -> Option<&DatapointValue> {
        self.datapoint(channel, key)
            .or_else(|| self.parameters.get(key))
    }
}
