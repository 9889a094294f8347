//! Device Registry - telemetry source of truth for a fleet of networked devices
//!
//! This library tracks known devices and the most recent messages each sent on
//! its telemetry topics (status, Wi-Fi scan, GPIO state):
//! - Device identity and in-place updates
//! - Bounded, newest-first history per device and topic
//! - Whole-collection snapshots persisted to a key-value store
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          Transport  │  UI  │  devreg CLI      │
//! └─────────────────────┬────────────────────────┘
//!                       │ add / update / record / query
//! ┌─────────────────────▼────────────────────────┐
//! │               DeviceRegistry                  │
//! │   devices  │  topic logs  │  revision watch   │
//! └─────────────────────┬────────────────────────┘
//!                       │ persist / restore (snapshot text)
//! ┌─────────────────────▼────────────────────────┐
//! │      SnapshotStore (SQLite, in-memory)        │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod devices;
pub mod error;
pub mod snapshot;
pub mod storage;

pub use config::Config;
pub use db::DbPool;
pub use devices::{
    AddOutcome, Delivery, Device, DeviceRegistry, InitOutcome, Message, MessageTopic,
    TOPIC_LOG_CAPACITY, TopicLog, UpdateOutcome,
};
pub use error::{Error, Result};
pub use snapshot::SNAPSHOT_KEY;
pub use storage::{MemoryStore, SnapshotStore, SqliteStore};
