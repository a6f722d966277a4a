//! Project documents: the hub's XML description of devices and their values.
//!
//! A full refresh returns the whole project; update events carry the same
//! shape holding only the datapoints that changed.

use hubbridge_domain::actuator::Actuator;
use hubbridge_domain::datapoint::DatapointValue;
use hubbridge_domain::rpc::DatapointUpdate;

use crate::error::XmppError;
use crate::xml::Element;

/// Whether a string payload looks like a project document.
#[must_use]
pub fn is_project(payload: &str) -> bool {
    let payload = payload.trim_start();
    let payload = payload
        .strip_prefix("<?xml")
        .and_then(|rest| rest.split_once("?>"))
        .map_or(payload, |(_, body)| body.trim_start());
    payload.starts_with("<project")
}

/// Parse a full project into actuators.
///
/// # Errors
///
/// Returns an error when the document is not well-formed.
pub fn parse_project(xml: &str) -> Result<Vec<Actuator>, XmppError> {
    let project = Element::parse(xml)?;
    Ok(devices(&project).filter_map(actuator).collect())
}

/// Flatten an update document into per-datapoint records.
///
/// Channel inputs, outputs, and parameters become records with a channel;
/// device-level parameters become records without one.
///
/// # Errors
///
/// Returns an error when the document is not well-formed.
pub fn parse_updates(xml: &str) -> Result<Vec<DatapointUpdate>, XmppError> {
    let project = Element::parse(xml)?;
    let mut updates = Vec::new();

    for device in devices(&project) {
        let Some(serial) = device.attr("serialNumber") else {
            continue;
        };
        for channel in channels(device) {
            let Some(channel_id) = channel.attr("i") else {
                continue;
            };
            for (key, value) in channel_values(channel) {
                updates.push(DatapointUpdate {
                    serial: serial.to_string(),
                    channel: Some(channel_id.to_string()),
                    datapoint: key.to_string(),
                    value,
                });
            }
        }
        for (key, value) in parameter_values(device) {
            updates.push(DatapointUpdate {
                serial: serial.to_string(),
                channel: None,
                datapoint: key.to_string(),
                value,
            });
        }
    }

    Ok(updates)
}

fn devices(project: &Element) -> impl Iterator<Item = &Element> {
    project
        .children_named("devices")
        .flat_map(|devices| devices.children_named("device"))
}

fn channels(device: &Element) -> impl Iterator<Item = &Element> {
    device
        .children_named("channels")
        .flat_map(|channels| channels.children_named("channel"))
}

fn actuator(device: &Element) -> Option<Actuator> {
    let serial = device.attr("serialNumber")?;
    let display_name = device
        .children_named("attribute")
        .find(|attribute| attribute.attr("name") == Some("displayName"))
        .map(Element::text)
        .filter(|name| !name.is_empty())
        .unwrap_or(serial);

    let mut actuator = Actuator::new(
        serial,
        device.attr("deviceId").unwrap_or_default(),
        display_name,
    );
    for channel in channels(device) {
        let Some(channel_id) = channel.attr("i") else {
            continue;
        };
        let slot = actuator.channel_mut(channel_id);
        for (key, value) in channel_values(channel) {
            slot.set(key, value);
        }
    }
    for (key, value) in parameter_values(device) {
        actuator.parameters.insert(key.to_string(), value);
    }
    Some(actuator)
}

/// Inputs, outputs, and parameters of a channel.
fn channel_values(channel: &Element) -> impl Iterator<Item = (&str, DatapointValue)> {
    ["inputs", "outputs"]
        .into_iter()
        .flat_map(move |group| channel.children_named(group))
        .flat_map(|group| group.children_named("dataPoint"))
        .filter_map(keyed_value)
        .chain(parameter_values(channel))
}

fn parameter_values(parent: &Element) -> impl Iterator<Item = (&str, DatapointValue)> {
    parent
        .children_named("parameters")
        .flat_map(|parameters| parameters.children_named("parameter"))
        .filter_map(keyed_value)
}

fn keyed_value(element: &Element) -> Option<(&str, DatapointValue)> {
    let key = element.attr("i")?;
    let raw = element.child("value").map_or("", Element::text);
    Some((key, DatapointValue::parse(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <devices>
    <device serialNumber="ABB700D12345" deviceId="B002">
      <attribute name="displayName">Kitchen light</attribute>
      <channels>
        <channel i="ch0000">
          <inputs><dataPoint i="idp0000"><value>0</value></dataPoint></inputs>
          <outputs><dataPoint i="odp0000"><value>1</value></dataPoint></outputs>
        </channel>
      </channels>
    </device>
    <device serialNumber="ABB700D00001" deviceId="B001">
      <channels>
        <channel i="ch0000">
          <outputs><dataPoint i="odp0000"><value>2</value></dataPoint></outputs>
          <parameters><parameter i="pm0006"><value>50</value></parameter></parameters>
        </channel>
      </channels>
      <parameters><parameter i="pm0001"><value>on</value></parameter></parameters>
    </device>
  </devices>
</project>"#;

    #[test]
    fn should_recognise_project_documents() {
        assert!(is_project(PROJECT));
        assert!(is_project("<project/>"));
        assert!(!is_project("OK"));
        assert!(!is_project("<value>1</value>"));
    }

    #[test]
    fn should_parse_devices_with_channels() {
        let actuators = parse_project(PROJECT).unwrap();
        assert_eq!(actuators.len(), 2);

        let light = &actuators[0];
        assert_eq!(light.serial, "ABB700D12345");
        assert_eq!(light.device_id, "B002");
        assert_eq!(light.type_name, "Kitchen light");
        assert_eq!(
            light.datapoint("ch0000", "odp0000"),
            Some(&DatapointValue::Number(1.0))
        );
    }

    #[test]
    fn should_keep_channel_and_device_parameters() {
        let actuators = parse_project(PROJECT).unwrap();
        let blind = &actuators[1];
        assert_eq!(blind.type_name, "ABB700D00001");
        assert_eq!(
            blind.parameter("ch0000", "pm0006"),
            Some(&DatapointValue::Number(50.0))
        );
        assert_eq!(
            blind.parameters.get("pm0001"),
            Some(&DatapointValue::Text("on".to_string()))
        );
    }

    #[test]
    fn should_flatten_update_document() {
        let updates = parse_updates(
            r#"<project><devices><device serialNumber="ABB700D12345"><channels><channel i="ch0000"><outputs><dataPoint i="odp0000"><value>0</value></dataPoint></outputs></channel></channels></device></devices></project>"#,
        )
        .unwrap();
        assert_eq!(
            updates,
            vec![DatapointUpdate {
                serial: "ABB700D12345".to_string(),
                channel: Some("ch0000".to_string()),
                datapoint: "odp0000".to_string(),
                value: DatapointValue::Number(0.0),
            }]
        );
    }

    #[test]
    fn should_report_device_parameters_without_channel() {
        let updates = parse_updates(PROJECT).unwrap();
        let device_level: Vec<_> = updates.iter().filter(|u| u.channel.is_none()).collect();
        assert_eq!(device_level.len(), 1);
        assert_eq!(device_level[0].datapoint, "pm0001");
    }
}
