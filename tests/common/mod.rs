//! Shared test utilities

#![allow(dead_code)]

use device_registry::devices::{GpioStateMessage, PinState, StatusMessage};
use device_registry::{Device, DeviceRegistry, Result, SnapshotStore, SqliteStore, db};

/// Set up a snapshot store over an in-memory test database
#[must_use]
pub fn setup_test_store() -> SqliteStore {
    SqliteStore::new(db::init_memory().expect("failed to init test db"))
}

/// A device with no messages
pub fn device(id: &str, name: &str, last_seen: i64) -> Device {
    Device::new(id, name, last_seen)
}

/// A status report whose firmware string encodes its sequence number
pub fn status(seq: i64) -> StatusMessage {
    let mut message = StatusMessage::at(seq);
    message.firmware = Some(format!("build-{seq}"));
    message
}

/// A GPIO snapshot with one pin
pub fn gpio(timestamp: i64, pin: u8, level: bool) -> GpioStateMessage {
    GpioStateMessage {
        timestamp,
        pins: vec![PinState {
            pin,
            level,
            mode: None,
        }],
    }
}

/// Registry with two devices and some history on each
pub fn populated_registry() -> DeviceRegistry {
    let mut registry = DeviceRegistry::new();
    registry.add_device(device("dev-1", "Kitchen", 1000));
    registry.add_device(device("dev-2", "Garage", 2000));
    for seq in 1..=13 {
        registry.record_message("dev-1", status(seq));
    }
    registry.record_message("dev-2", gpio(5, 4, true));
    registry.record_message("dev-2", gpio(6, 4, false));
    registry
}

/// Store that is never reachable
pub struct UnavailableStore;

impl SnapshotStore for UnavailableStore {
    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(device_registry::Error::Store("storage quota exceeded".to_string()))
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(device_registry::Error::Store("storage unavailable".to_string()))
    }
}
