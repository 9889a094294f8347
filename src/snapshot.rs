//! Snapshot encoding for the full device collection
//!
//! A snapshot is the JSON array of all devices, including their topic logs.
//! It is always written whole under [`SNAPSHOT_KEY`].

use std::collections::HashSet;

use crate::devices::{Device, TOPIC_LOG_CAPACITY};
use crate::{Error, Result};

/// Store key holding the one snapshot
pub const SNAPSHOT_KEY: &str = "Device_Data";

/// Serialize devices into snapshot text
///
/// # Errors
///
/// Returns error if serialization fails
pub fn encode(devices: &[Device]) -> Result<String> {
    Ok(serde_json::to_string(devices)?)
}

/// Parse snapshot text back into devices
///
/// # Errors
///
/// Returns error if the text is not valid JSON for a device list, or if it
/// breaks an invariant the registry maintains (unique IDs, one bounded log per
/// topic). Log payloads are decoded by the topic of their log.
pub fn decode(text: &str) -> Result<Vec<Device>> {
    let devices: Vec<Device> = serde_json::from_str(text)?;
    validate(&devices)?;
    Ok(devices)
}

fn validate(devices: &[Device]) -> Result<()> {
    let mut ids = HashSet::new();
    for device in devices {
        if !ids.insert(device.id.as_str()) {
            return Err(Error::Snapshot(format!("duplicate device id '{}'", device.id)));
        }

        let mut topics = HashSet::new();
        for log in &device.message_logs {
            let topic = log.topic();
            if !topics.insert(topic) {
                return Err(Error::Snapshot(format!(
                    "device '{}' has more than one {topic} log",
                    device.id
                )));
            }
            if log.len() > TOPIC_LOG_CAPACITY {
                return Err(Error::Snapshot(format!(
                    "device '{}' {topic} log holds {} messages (max {TOPIC_LOG_CAPACITY})",
                    device.id,
                    log.len()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::devices::{DeviceRegistry, MessageTopic, StatusMessage, WifiNetwork, WifiScanMessage};

    fn populated() -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        registry.add_device(Device::new("dev-1", "Kitchen", 1000));
        registry.add_device(Device::new("dev-2", "Garage", 2000));
        for ts in 0..12 {
            registry.record_message("dev-1", StatusMessage::at(ts));
        }
        registry.record_message(
            "dev-2",
            WifiScanMessage {
                timestamp: 7,
                networks: vec![WifiNetwork {
                    ssid: "home".to_string(),
                    bssid: Some("aa:bb:cc:dd:ee:ff".to_string()),
                    rssi: -48,
                    channel: Some(6),
                    secure: Some(true),
                }],
            },
        );
        registry
    }

    #[test]
    fn encode_decode_preserves_devices() {
        let registry = populated();
        let text = encode(registry.devices()).unwrap();
        let devices = decode(&text).unwrap();

        assert_eq!(devices, registry.devices());
        assert_eq!(devices[0].messages(MessageTopic::Status).len(), TOPIC_LOG_CAPACITY);
    }

    #[test]
    fn encoded_field_names() {
        let text = encode(&[Device::new("dev-1", "Kitchen", 1000)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            json!([{ "id": "dev-1", "name": "Kitchen", "lastSeen": 1000, "messageLogs": [] }])
        );
    }

    #[test]
    fn decode_rejects_duplicate_ids() {
        let text = json!([
            { "id": "dev-1", "name": "a", "lastSeen": 0 },
            { "id": "dev-1", "name": "b", "lastSeen": 0 }
        ])
        .to_string();

        assert!(matches!(decode(&text), Err(Error::Snapshot(_))));
    }

    #[test]
    fn logs_are_stored_as_bare_payloads() {
        let mut registry = DeviceRegistry::new();
        registry.add_device(Device::new("dev-1", "Kitchen", 0));
        registry.record_message("dev-1", StatusMessage::at(5));

        let value: serde_json::Value =
            serde_json::from_str(&encode(registry.devices()).unwrap()).unwrap();
        assert_eq!(
            value[0]["messageLogs"],
            json!([{ "topic": "STATUS", "messages": [{ "timestamp": 5 }] }])
        );
    }

    #[test]
    fn decode_rejects_payload_foreign_to_log_topic() {
        let text = json!([{
            "id": "dev-1",
            "name": "a",
            "lastSeen": 0,
            "messageLogs": [{
                "topic": "GPIO_STATE",
                "messages": [{ "timestamp": 1, "pins": "GPIO2 high" }]
            }]
        }])
        .to_string();

        assert!(matches!(decode(&text), Err(Error::Serialization(_))));
    }

    #[test]
    fn decode_rejects_oversized_log() {
        let messages: Vec<_> = (0..11)
            .map(|ts| json!({ "timestamp": ts }))
            .collect();
        let text = json!([{
            "id": "dev-1",
            "name": "a",
            "lastSeen": 0,
            "messageLogs": [{ "topic": "STATUS", "messages": messages }]
        }])
        .to_string();

        assert!(matches!(decode(&text), Err(Error::Snapshot(_))));
    }

    #[test]
    fn decode_rejects_malformed_text() {
        assert!(matches!(decode("not json"), Err(Error::Serialization(_))));
    }
}
