//! Value transformation: turns a [`ValueSpec`] into a concrete write.
//!
//! Symbolic values are resolved against the actuator state known at call
//! time. The read is not atomic with the eventual write: two toggles issued
//! before the hub reports the first one compute the same value.

use std::time::Duration;

use crate::actuator::Actuator;
use crate::command::{Direction, ValueSpec, is_thermostat};
use crate::datapoint::{self, DatapointTarget, DatapointValue, DatapointWrite};
use crate::error::CommandError;

/// Thermostats take set-points relative to this temperature.
pub const REFERENCE_TEMPERATURE: f64 = 21.0;

/// Fixed part of the pulse delay; the motor delay parameter is added to it.
pub const PULSE_BASE_DELAY: Duration = Duration::from_millis(200);

/// The outcome of transforming a value spec.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Send now.
    Immediate(DatapointWrite),
    /// Send once `delay` has elapsed.
    Deferred {
        delay: Duration,
        write: DatapointWrite,
    },
}

impl Resolution {
    /// The write, whenever it happens.
    #[must_use]
    pub fn write(&self) -> &DatapointWrite {
        match self {
            Self::Immediate(write) | Self::Deferred { write, .. } => write,
        }
    }

    /// The delay before sending, if any.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::Immediate(_) => None,
            Self::Deferred { delay, .. } => Some(*delay),
        }
    }
}

/// Resolve `spec` for `target`.
///
/// `actuator` is the current state of the actuator owning `target.serial`;
/// literal and caller values do not need it.
///
/// # Errors
///
/// Returns [`CommandError::MissingValue`] when a caller value is required but
/// absent, [`CommandError::InvalidValue`] when it is not finite, and
/// [`CommandError::MissingState`] when a delta has no current
/// set-point to start from.
pub fn transform(
    target: &DatapointTarget,
    spec: ValueSpec,
    caller_value: Option<f64>,
    actuator: Option<&Actuator>,
) -> Result<Resolution, CommandError> {
    let current = |key: &str| actuator.and_then(|a| a.datapoint(&target.channel, key));

    let write = match spec {
        ValueSpec::Literal(value) => target.clone().write(value),
        ValueSpec::Caller => target.clone().write(require(target, caller_value)?),
        ValueSpec::CallerOffset => target
            .clone()
            .write(require(target, caller_value)? - REFERENCE_TEMPERATURE),
        ValueSpec::Toggle => {
            let read_key = if actuator.is_some_and(|a| is_thermostat(&a.device_id)) {
                Some(datapoint::THERMOSTAT_SWITCH_STATE.to_string())
            } else {
                datapoint::counterpart(&target.datapoint)
            };
            let is_on = read_key
                .as_deref()
                .and_then(current)
                .is_some_and(DatapointValue::is_set);
            target.clone().write(if is_on { 0.0 } else { 1.0 })
        }
        ValueSpec::MoveToggle(direction) => {
            let moving = actuator.and_then(|a| movement(a, &target.channel));
            if moving == Some(direction.opposite()) {
                target.with_datapoint(datapoint::STOP).write(1.0)
            } else {
                target.clone().write(direction.code())
            }
        }
        ValueSpec::Pulse(_) => {
            let motor_delay = actuator
                .and_then(|a| a.parameter(&target.channel, datapoint::MOTOR_DELAY))
                .and_then(DatapointValue::as_f64)
                .map_or(0, millis);
            return Ok(Resolution::Deferred {
                delay: PULSE_BASE_DELAY + Duration::from_millis(motor_delay),
                write: target.with_datapoint(datapoint::STOP).write(1.0),
            });
        }
        ValueSpec::Delta(delta) => {
            let set_point = current(datapoint::THERMOSTAT_SET_POINT)
                .and_then(DatapointValue::as_f64)
                .ok_or_else(|| CommandError::MissingState {
                    serial: target.serial.clone(),
                    channel: target.channel.clone(),
                    datapoint: datapoint::THERMOSTAT_SET_POINT.to_string(),
                })?;
            target
                .clone()
                .write(set_point + delta - REFERENCE_TEMPERATURE)
        }
    };

    Ok(Resolution::Immediate(write))
}

fn require(target: &DatapointTarget, value: Option<f64>) -> Result<f64, CommandError> {
    match value {
        Some(value) if value.is_finite() => Ok(value),
        Some(_) => Err(CommandError::InvalidValue {
            datapoint: target.datapoint.clone(),
        }),
        None => Err(CommandError::MissingValue {
            datapoint: target.datapoint.clone(),
        }),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// Movement direction currently reported by a shutter channel, if moving.
#[must_use]
pub fn movement(actuator: &Actuator, channel: &str) -> Option<Direction> {
    let status = actuator
        .datapoint(channel, datapoint::MOVEMENT_STATUS)
        .and_then(DatapointValue::as_f64)?;
    [Direction::Up, Direction::Down]
        .into_iter()
        .find(|direction| direction.moving_status() == status)
}
