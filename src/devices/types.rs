//! Device and topic log types

use std::fmt;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::message::Message;

/// Maximum number of messages retained per device and topic
pub const TOPIC_LOG_CAPACITY: usize = 10;

/// Telemetry topic a device publishes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageTopic {
    /// Periodic device status
    Status,

    /// Wireless network scan results
    WifiScan,

    /// Pin level snapshot
    GpioState,
}

impl MessageTopic {
    /// All topics in display order
    pub const ALL: [Self; 3] = [Self::Status, Self::WifiScan, Self::GpioState];

    /// Wire name of the topic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "STATUS",
            Self::WifiScan => "WIFI_SCAN",
            Self::GpioState => "GPIO_STATE",
        }
    }
}

impl fmt::Display for MessageTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded, newest-first message history for one device and topic
///
/// Only the registry appends to a log, which keeps the capacity and the
/// topic of every stored message consistent. Messages are stored as bare
/// payloads and decoded by the log's topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTopicLog")]
pub struct TopicLog {
    topic: MessageTopic,
    #[serde(serialize_with = "serialize_payloads")]
    messages: Vec<Message>,
}

/// Stored form of a log before its payloads are decoded
#[derive(Deserialize)]
struct RawTopicLog {
    topic: MessageTopic,
    #[serde(default)]
    messages: Vec<Value>,
}

impl TryFrom<RawTopicLog> for TopicLog {
    type Error = crate::Error;

    fn try_from(raw: RawTopicLog) -> crate::Result<Self> {
        let messages = raw
            .messages
            .into_iter()
            .map(|payload| Message::decode(raw.topic, payload))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Self {
            topic: raw.topic,
            messages,
        })
    }
}

fn serialize_payloads<S>(messages: &[Message], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(messages.len()))?;
    for message in messages {
        match message {
            Message::Status(m) => seq.serialize_element(m)?,
            Message::WifiScan(m) => seq.serialize_element(m)?,
            Message::GpioState(m) => seq.serialize_element(m)?,
        }
    }
    seq.end()
}

impl TopicLog {
    pub(crate) const fn new(topic: MessageTopic) -> Self {
        Self {
            topic,
            messages: Vec::new(),
        }
    }

    /// Topic this log belongs to
    #[must_use]
    pub const fn topic(&self) -> MessageTopic {
        self.topic
    }

    /// Stored messages, newest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message, if any
    #[must_use]
    pub fn latest(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Number of stored messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log holds no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Insert at the head, returning how many old messages were evicted
    pub(crate) fn push(&mut self, message: Message) -> usize {
        debug_assert_eq!(message.topic(), self.topic);
        self.messages.insert(0, message);
        let evicted = self.messages.len().saturating_sub(TOPIC_LOG_CAPACITY);
        self.messages.truncate(TOPIC_LOG_CAPACITY);
        evicted
    }
}

/// A known device and its recent telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable identifier assigned by the device itself
    pub id: String,

    /// Human-readable label
    pub name: String,

    /// Last contact, epoch milliseconds
    pub last_seen: i64,

    /// At most one log per topic, created on first message
    #[serde(default)]
    pub message_logs: Vec<TopicLog>,
}

impl Device {
    /// Create a device with no recorded messages
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, last_seen: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_seen,
            message_logs: Vec::new(),
        }
    }

    /// Log for a topic, if the device has sent on it
    #[must_use]
    pub fn log(&self, topic: MessageTopic) -> Option<&TopicLog> {
        self.message_logs.iter().find(|l| l.topic == topic)
    }

    /// Messages for a topic, newest first (empty if none were received)
    #[must_use]
    pub fn messages(&self, topic: MessageTopic) -> &[Message] {
        self.log(topic).map(TopicLog::messages).unwrap_or_default()
    }

    /// Find or lazily create the log for a topic
    pub(crate) fn log_mut(&mut self, topic: MessageTopic) -> &mut TopicLog {
        let index = match self.message_logs.iter().position(|l| l.topic == topic) {
            Some(index) => index,
            None => {
                self.message_logs.push(TopicLog::new(topic));
                self.message_logs.len() - 1
            }
        };
        &mut self.message_logs[index]
    }

    /// Bring externally built logs in line with the registry's invariants
    ///
    /// Logs repeating a topic are merged into the first one (their messages
    /// appended after its own), messages filed under a foreign topic are
    /// dropped, and every log is cut to capacity. Returns whether anything
    /// changed.
    pub(crate) fn normalize(&mut self) -> bool {
        let mut changed = false;
        let mut logs: Vec<TopicLog> = Vec::with_capacity(self.message_logs.len());

        for log in std::mem::take(&mut self.message_logs) {
            let topic = log.topic;
            let before = log.messages.len();
            let kept: Vec<Message> = log
                .messages
                .into_iter()
                .filter(|m| m.topic() == topic)
                .collect();
            changed |= kept.len() != before;

            if let Some(existing) = logs.iter_mut().find(|l| l.topic == topic) {
                existing.messages.extend(kept);
                changed = true;
            } else {
                logs.push(TopicLog {
                    topic,
                    messages: kept,
                });
            }
        }

        for log in &mut logs {
            changed |= log.messages.len() > TOPIC_LOG_CAPACITY;
            log.messages.truncate(TOPIC_LOG_CAPACITY);
        }

        self.message_logs = logs;
        changed
    }
}

/// Result of inserting a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Device was added
    Inserted,

    /// A device with the same ID exists; nothing changed
    AlreadyPresent,
}

/// Result of an update addressed to a device ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The device was found and updated
    Updated,

    /// No device with that ID; nothing changed
    NotFound,
}

/// Result of seeding the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Collection replaced with the seed
    Seeded,

    /// Registry was seeded earlier; nothing changed
    AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::message::StatusMessage;

    fn status(timestamp: i64) -> Message {
        Message::Status(StatusMessage::at(timestamp))
    }

    #[test]
    fn push_keeps_newest_first() {
        let mut log = TopicLog::new(MessageTopic::Status);
        log.push(status(1));
        log.push(status(2));

        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().map(Message::timestamp), Some(2));
        assert_eq!(log.messages()[1].timestamp(), 1);
    }

    #[test]
    fn push_evicts_beyond_capacity() {
        let mut log = TopicLog::new(MessageTopic::Status);
        for ts in 0..10 {
            assert_eq!(log.push(status(ts)), 0);
        }
        assert_eq!(log.push(status(10)), 1);

        assert_eq!(log.len(), TOPIC_LOG_CAPACITY);
        assert_eq!(log.latest().map(Message::timestamp), Some(10));
        assert!(log.messages().iter().all(|m| m.timestamp() != 0));
    }

    #[test]
    fn log_mut_creates_once_per_topic() {
        let mut device = Device::new("dev-1", "Kitchen", 0);
        device.log_mut(MessageTopic::GpioState);
        device.log_mut(MessageTopic::GpioState);
        device.log_mut(MessageTopic::Status);

        assert_eq!(device.message_logs.len(), 2);
        assert!(device.log(MessageTopic::WifiScan).is_none());
        assert!(device.messages(MessageTopic::WifiScan).is_empty());
    }

    fn status_log(stamps: impl IntoIterator<Item = i64>) -> TopicLog {
        TopicLog {
            topic: MessageTopic::Status,
            messages: stamps.into_iter().map(status).collect(),
        }
    }

    #[test]
    fn normalize_merges_and_caps_logs() {
        let mut device = Device::new("dev-1", "Kitchen", 0);
        device.message_logs = vec![status_log((0..15).rev()), status_log([99])];

        assert!(device.normalize());
        assert_eq!(device.message_logs.len(), 1);

        let stamps: Vec<i64> = device
            .messages(MessageTopic::Status)
            .iter()
            .map(Message::timestamp)
            .collect();
        assert_eq!(stamps, (5..15).rev().collect::<Vec<_>>());
    }

    #[test]
    fn normalize_drops_foreign_messages() {
        let mut device = Device::new("dev-1", "Kitchen", 0);
        let mut log = TopicLog::new(MessageTopic::GpioState);
        log.messages.push(status(1));
        device.message_logs.push(log);

        assert!(device.normalize());
        assert!(device.messages(MessageTopic::GpioState).is_empty());
    }

    #[test]
    fn normalize_leaves_valid_device_alone() {
        let mut device = Device::new("dev-1", "Kitchen", 0);
        device.log_mut(MessageTopic::Status).push(status(1));
        let before = device.clone();

        assert!(!device.normalize());
        assert_eq!(device, before);
    }

    #[test]
    fn log_stores_bare_payloads() {
        let mut log = TopicLog::new(MessageTopic::Status);
        log.push(status(7));

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "topic": "STATUS", "messages": [{ "timestamp": 7 }] })
        );

        let back: TopicLog = serde_json::from_value(value).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn log_payload_must_fit_its_topic() {
        let value = serde_json::json!({
            "topic": "WIFI_SCAN",
            "messages": [{ "timestamp": 1, "networks": "none" }]
        });
        assert!(serde_json::from_value::<TopicLog>(value).is_err());
    }

    #[test]
    fn topic_wire_names() {
        assert_eq!(
            serde_json::to_string(&MessageTopic::WifiScan).unwrap(),
            "\"WIFI_SCAN\""
        );
        assert_eq!(MessageTopic::GpioState.to_string(), "GPIO_STATE");
    }
}
