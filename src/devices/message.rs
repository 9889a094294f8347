//! Topic payloads and transport deliveries

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::types::MessageTopic;
use crate::Result;

/// Periodic status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Report time, epoch milliseconds
    pub timestamp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Signal strength of the current uplink (dBm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_heap: Option<u64>,

    /// Fields this crate does not model, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusMessage {
    /// Status report carrying only a timestamp
    #[must_use]
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            firmware: None,
            ip: None,
            rssi: None,
            uptime_secs: None,
            free_heap: None,
            extra: Map::new(),
        }
    }
}

/// One network seen during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,

    /// dBm
    pub rssi: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
}

/// Result of a wireless scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiScanMessage {
    pub timestamp: i64,

    #[serde(default)]
    pub networks: Vec<WifiNetwork>,
}

/// Level of a single pin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinState {
    pub pin: u8,

    /// `true` for high
    pub level: bool,

    /// Pin mode as reported by the device (e.g. "input", "output")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Snapshot of pin levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioStateMessage {
    pub timestamp: i64,

    #[serde(default)]
    pub pins: Vec<PinState>,
}

/// A decoded telemetry message, tagged by topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Status(StatusMessage),
    WifiScan(WifiScanMessage),
    GpioState(GpioStateMessage),
}

impl Message {
    /// Topic the message was published on
    #[must_use]
    pub const fn topic(&self) -> MessageTopic {
        match self {
            Self::Status(_) => MessageTopic::Status,
            Self::WifiScan(_) => MessageTopic::WifiScan,
            Self::GpioState(_) => MessageTopic::GpioState,
        }
    }

    /// Device-reported time of the message
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        match self {
            Self::Status(m) => m.timestamp,
            Self::WifiScan(m) => m.timestamp,
            Self::GpioState(m) => m.timestamp,
        }
    }

    /// Build a message from a topic and its raw payload
    ///
    /// # Errors
    ///
    /// Returns error if the payload does not match the topic's shape
    pub fn decode(topic: MessageTopic, payload: Value) -> Result<Self> {
        Ok(match topic {
            MessageTopic::Status => Self::Status(serde_json::from_value(payload)?),
            MessageTopic::WifiScan => Self::WifiScan(serde_json::from_value(payload)?),
            MessageTopic::GpioState => Self::GpioState(serde_json::from_value(payload)?),
        })
    }
}

impl From<StatusMessage> for Message {
    fn from(m: StatusMessage) -> Self {
        Self::Status(m)
    }
}

impl From<WifiScanMessage> for Message {
    fn from(m: WifiScanMessage) -> Self {
        Self::WifiScan(m)
    }
}

impl From<GpioStateMessage> for Message {
    fn from(m: GpioStateMessage) -> Self {
        Self::GpioState(m)
    }
}

/// A message as handed over by the transport layer, payload not yet decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub device_id: String,
    pub topic: MessageTopic,
    pub payload: Value,
}

impl Delivery {
    /// Parse a delivery from one JSON document
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid delivery
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Split into the target device ID and the decoded message
    ///
    /// # Errors
    ///
    /// Returns error if the payload does not match the topic's shape
    pub fn into_parts(self) -> Result<(String, Message)> {
        let message = Message::decode(self.topic, self.payload)?;
        Ok((self.device_id, message))
    }
}
