//! Device registry
//!
//! Devices are identified by an externally assigned ID and keep the last
//! few messages they sent on each telemetry topic

pub mod message;
pub mod registry;
pub mod types;

pub use message::{
    Delivery, GpioStateMessage, Message, PinState, StatusMessage, WifiNetwork, WifiScanMessage,
};
pub use registry::DeviceRegistry;
pub use types::{
    AddOutcome, Device, InitOutcome, MessageTopic, TOPIC_LOG_CAPACITY, TopicLog, UpdateOutcome,
};
