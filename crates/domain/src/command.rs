//! Command table and request resolution.
//!
//! The table maps every public actuator type to its actions, each action to
//! exactly one `(datapoint, value spec)` pair and, for physical actuators,
//! the hardware type codes the type may be used with. Group and scene types
//! have no such list: they address virtual bus endpoints, so existence in the
//! state store is all that is checked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::actuator::Actuator;
use crate::datapoint::DatapointTarget;
use crate::error::CommandError;

/// Public actuator types a request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    Switch,
    SwitchGroup,
    Dimmer,
    Shutter,
    ShutterGroup,
    Scene,
    Thermostat,
}

/// Movement direction of a shutter. The discriminant is the value written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up = 0,
    Down = 1,
}

impl Direction {
    /// Value the movement input expects for this direction.
    #[must_use]
    pub fn code(self) -> f64 {
        f64::from(self as u8)
    }

    /// Movement status reported while travelling in this direction.
    #[must_use]
    pub fn moving_status(self) -> f64 {
        match self {
            Self::Up => 2.0,
            Self::Down => 3.0,
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// How the value of an action is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueSpec {
    /// A fixed value.
    Literal(f64),
    /// The complement of the current on/off output.
    Toggle,
    /// Move in a direction, or stop if already moving the other way.
    MoveToggle(Direction),
    /// Stop after a short delay (jog).
    Pulse(Direction),
    /// Add to the current set-point, expressed relative to the reference.
    Delta(f64),
    /// The caller's value, unchanged.
    Caller,
    /// The caller's absolute value, expressed relative to the reference.
    CallerOffset,
}

/// The single write an action resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionSpec {
    pub datapoint: &'static str,
    pub value: ValueSpec,
}

const fn act(datapoint: &'static str, value: ValueSpec) -> ActionSpec {
    ActionSpec { datapoint, value }
}

const SWITCH_DEVICES: &[&str] = &["B002", "100E", "B008", "10C4", "1002", "1000"];
const DIMMER_DEVICES: &[&str] = &["101C", "1021", "10C0", "1017", "1019", "1010"];
const SHUTTER_DEVICES: &[&str] = &["B001", "1013", "1015", "10C1"];
const THERMOSTAT_DEVICES: &[&str] = &["1004", "9004", "9010", "9011"];

const SWITCH_ACTIONS: &[(&str, ActionSpec)] = &[
    ("on", act("idp0000", ValueSpec::Literal(1.0))),
    ("off", act("idp0000", ValueSpec::Literal(0.0))),
    ("toggle", act("idp0000", ValueSpec::Toggle)),
];

const DIMMER_ACTIONS: &[(&str, ActionSpec)] = &[
    ("on", act("idp0000", ValueSpec::Literal(1.0))),
    ("off", act("idp0000", ValueSpec::Literal(0.0))),
    ("toggle", act("idp0000", ValueSpec::Toggle)),
    ("set", act("idp0002", ValueSpec::Caller)),
];

const SHUTTER_ACTIONS: &[(&str, ActionSpec)] = &[
    ("up", act("idp0000", ValueSpec::MoveToggle(Direction::Up))),
    ("down", act("idp0000", ValueSpec::MoveToggle(Direction::Down))),
    ("stop", act("idp0001", ValueSpec::Literal(1.0))),
    ("step-up", act("idp0000", ValueSpec::Pulse(Direction::Up))),
    ("step-down", act("idp0000", ValueSpec::Pulse(Direction::Down))),
    ("set", act("idp0002", ValueSpec::Caller)),
];

const THERMOSTAT_ACTIONS: &[(&str, ActionSpec)] = &[
    ("on", act("idp0012", ValueSpec::Literal(1.0))),
    ("off", act("idp0012", ValueSpec::Literal(0.0))),
    ("toggle", act("idp0012", ValueSpec::Toggle)),
    ("up", act("idp0016", ValueSpec::Delta(0.5))),
    ("down", act("idp0016", ValueSpec::Delta(-0.5))),
    ("set", act("idp0016", ValueSpec::CallerOffset)),
];

const SWITCH_GROUP_ACTIONS: &[(&str, ActionSpec)] = &[
    ("on", act("odp0000", ValueSpec::Literal(1.0))),
    ("off", act("odp0000", ValueSpec::Literal(0.0))),
];

const SHUTTER_GROUP_ACTIONS: &[(&str, ActionSpec)] = &[
    ("up", act("odp0000", ValueSpec::Literal(0.0))),
    ("down", act("odp0000", ValueSpec::Literal(1.0))),
    ("stop", act("odp0001", ValueSpec::Literal(1.0))),
];

const SCENE_ACTIONS: &[(&str, ActionSpec)] = &[("set", act("odp0000", ValueSpec::Literal(1.0)))];

impl ActuatorKind {
    /// Every type in the table.
    pub const ALL: [Self; 7] = [
        Self::Switch,
        Self::SwitchGroup,
        Self::Dimmer,
        Self::Shutter,
        Self::ShutterGroup,
        Self::Scene,
        Self::Thermostat,
    ];

    /// Public name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::SwitchGroup => "switchgroup",
            Self::Dimmer => "dimmer",
            Self::Shutter => "shutter",
            Self::ShutterGroup => "shuttergroup",
            Self::Scene => "scene",
            Self::Thermostat => "thermostat",
        }
    }

    /// Hardware type codes the type may be used with, `None` for virtual types.
    #[must_use]
    pub fn device_ids(self) -> Option<&'static [&'static str]> {
        match self {
            Self::Switch => Some(SWITCH_DEVICES),
            Self::Dimmer => Some(DIMMER_DEVICES),
            Self::Shutter => Some(SHUTTER_DEVICES),
            Self::Thermostat => Some(THERMOSTAT_DEVICES),
            Self::SwitchGroup | Self::ShutterGroup | Self::Scene => None,
        }
    }

    /// Whether an actuator with this hardware code may be driven as this type.
    #[must_use]
    pub fn accepts(self, device_id: &str) -> bool {
        self.device_ids().is_none_or(|ids| ids.contains(&device_id))
    }

    /// All actions of the type.
    #[must_use]
    pub fn actions(self) -> &'static [(&'static str, ActionSpec)] {
        match self {
            Self::Switch => SWITCH_ACTIONS,
            Self::SwitchGroup => SWITCH_GROUP_ACTIONS,
            Self::Dimmer => DIMMER_ACTIONS,
            Self::Shutter => SHUTTER_ACTIONS,
            Self::ShutterGroup => SHUTTER_GROUP_ACTIONS,
            Self::Scene => SCENE_ACTIONS,
            Self::Thermostat => THERMOSTAT_ACTIONS,
        }
    }

    /// Look up a single action.
    #[must_use]
    pub fn action(self, name: &str) -> Option<ActionSpec> {
        self.actions()
            .iter()
            .find(|(action, _)| *action == name)
            .map(|(_, spec)| *spec)
    }
}

/// Whether a hardware code belongs to a thermostat-class device.
#[must_use]
pub fn is_thermostat(device_id: &str) -> bool {
    THERMOSTAT_DEVICES.contains(&device_id)
}

impl FromStr for ActuatorKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "blind" is the public synonym for the shutter hardware
        if s == "blind" {
            return Ok(Self::Shutter);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommandError::UnknownType {
                kind: s.to_string(),
            })
    }
}

impl fmt::Display for ActuatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to drive one actuator channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub kind: String,
    pub serial: String,
    pub channel: String,
    pub action: String,
    #[serde(default)]
    pub value: Option<f64>,
}

impl CommandRequest {
    /// Build a request without a caller value.
    pub fn new(
        kind: impl Into<String>,
        serial: impl Into<String>,
        channel: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            serial: serial.into(),
            channel: channel.into(),
            action: action.into(),
            value: None,
        }
    }

    /// Attach a caller value.
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// A request that passed validation, ready for value transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCommand {
    pub kind: ActuatorKind,
    pub action: String,
    /// Identifier used in the request.
    pub request_serial: String,
    /// Display name of the requested actuator.
    pub display_name: String,
    /// Where the write goes (the owning actuator for scenes).
    pub target: DatapointTarget,
    pub value: ValueSpec,
    pub caller_value: Option<f64>,
}

/// Validate a request against the command table and known actuators.
///
/// Checks run in order and the first failure wins: type, action, actuator
/// existence, then hardware type. `lookup` is only consulted once the type
/// and action are known to be valid.
///
/// # Errors
///
/// Returns the [`CommandError`] of the first failing check.
pub fn resolve(
    request: &CommandRequest,
    lookup: impl FnOnce(&str) -> Option<Actuator>,
) -> Result<ResolvedCommand, CommandError> {
    let kind: ActuatorKind = request.kind.parse()?;
    let spec = kind
        .action(&request.action)
        .ok_or_else(|| CommandError::UnknownAction {
            kind: request.kind.clone(),
            action: request.action.clone(),
        })?;
    let actuator = lookup(&request.serial).ok_or_else(|| CommandError::UnknownActuator {
        serial: request.serial.clone(),
    })?;
    if !kind.accepts(&actuator.device_id) {
        return Err(CommandError::DeviceMismatch {
            serial: request.serial.clone(),
            name: actuator.type_name.clone(),
            kind: request.kind.clone(),
        });
    }

    let write_serial = if kind == ActuatorKind::Scene {
        actuator.serial_number.clone()
    } else {
        request.serial.clone()
    };

    Ok(ResolvedCommand {
        kind,
        action: request.action.clone(),
        request_serial: request.serial.clone(),
        display_name: actuator.type_name,
        target: DatapointTarget::new(write_serial, &request.channel, spec.datapoint),
        value: spec.value,
        caller_value: request.value,
    })
}
