//! Command receipts: the typed success result of a command.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::command::{ActuatorKind, ResolvedCommand};
use crate::datapoint::DatapointWrite;
use crate::transform::Resolution;

/// What was sent (or scheduled) for a command.
///
/// `Display` renders the human-readable confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReceipt {
    pub kind: ActuatorKind,
    pub action: String,
    /// Identifier used in the request.
    pub serial: String,
    pub display_name: String,
    pub channel: String,
    pub write: DatapointWrite,
    /// Milliseconds until the write is sent, for deferred writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_ms: Option<u64>,
}

impl CommandReceipt {
    /// Build the receipt for a resolved command.
    #[must_use]
    pub fn new(command: &ResolvedCommand, resolution: &Resolution) -> Self {
        Self {
            kind: command.kind,
            action: command.action.clone(),
            serial: command.request_serial.clone(),
            display_name: command.display_name.clone(),
            channel: command.target.channel.clone(),
            write: resolution.write().clone(),
            deferred_ms: resolution
                .delay()
                .map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Delay before the write is sent, if deferred.
    #[must_use]
    pub fn deferred(&self) -> Option<Duration> {
        self.deferred_ms.map(Duration::from_millis)
    }
}

impl fmt::Display for CommandReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} of {} {} ({}) set to {}: {}",
            self.channel, self.kind, self.serial, self.display_name, self.action, self.write
        )?;
        if let Some(ms) = self.deferred_ms {
            write!(f, " in {ms} ms")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ValueSpec;
    use crate::datapoint::DatapointTarget;

    fn command(target: DatapointTarget) -> ResolvedCommand {
        ResolvedCommand {
            kind: ActuatorKind::Scene,
            action: "set".to_string(),
            request_serial: "FFFF48010001".to_string(),
            display_name: "Movie night".to_string(),
            target,
            value: ValueSpec::Literal(1.0),
            caller_value: None,
        }
    }

    #[test]
    fn should_describe_channel_type_serial_action_and_write() {
        let target = DatapointTarget::new("ABB700D12345", "ch0000", "odp0000");
        let resolution = Resolution::Immediate(target.clone().write(1.0));
        let receipt = CommandReceipt::new(&command(target), &resolution);
        assert_eq!(
            receipt.to_string(),
            "channel ch0000 of scene FFFF48010001 (Movie night) set to set: ABB700D12345/ch0000/odp0000: 1"
        );
    }

    #[test]
    fn should_mention_delay_when_deferred() {
        let target = DatapointTarget::new("S1", "ch0000", "idp0000");
        let resolution = Resolution::Deferred {
            delay: Duration::from_millis(250),
            write: target.with_datapoint("idp0001").write(1.0),
        };
        let receipt = CommandReceipt::new(&command(target), &resolution);
        assert_eq!(receipt.deferred(), Some(Duration::from_millis(250)));
        assert!(receipt.to_string().ends_with("S1/ch0000/idp0001: 1 in 250 ms"));
    }
}
