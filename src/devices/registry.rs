//! Device registry with bounded per-topic message history

use std::collections::HashSet;

use tokio::sync::watch;

use super::message::{Delivery, Message};
use super::types::{AddOutcome, Device, InitOutcome, UpdateOutcome};
use crate::Result;
use crate::snapshot::{self, SNAPSHOT_KEY};
use crate::storage::SnapshotStore;

/// Registry of known devices
///
/// Single owner: every mutation takes `&mut self`, reads hand out shared
/// references only. Observers learn about committed changes through
/// [`DeviceRegistry::subscribe`].
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    initialized: bool,
    /// Bumped after every mutation that changed state
    revision: watch::Sender<u64>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Create a new empty, unseeded registry
    #[must_use]
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            devices: Vec::new(),
            initialized: false,
            revision,
        }
    }

    /// Seed the registry, once
    ///
    /// The first call replaces the collection with `seed`; every later call is
    /// a no-op. Devices repeating an ID already in the seed are dropped, and
    /// each device's logs are brought within the per-topic limits.
    pub fn initialize(&mut self, seed: Vec<Device>) -> InitOutcome {
        if self.initialized {
            tracing::debug!("registry already initialized, ignoring seed");
            return InitOutcome::AlreadyInitialized;
        }

        let mut seen = HashSet::new();
        let mut devices = Vec::with_capacity(seed.len());
        for mut device in seed {
            if seen.insert(device.id.clone()) {
                Self::normalize(&mut device);
                devices.push(device);
            } else {
                tracing::warn!(device_id = %device.id, "duplicate device in seed, keeping first");
            }
        }

        tracing::info!(devices = devices.len(), "registry seeded");
        self.devices = devices;
        self.initialized = true;
        self.bump();
        InitOutcome::Seeded
    }

    /// Whether [`Self::initialize`] has run
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Add a device unless one with the same ID is already known
    ///
    /// Logs the device arrives with are merged per topic and trimmed to
    /// capacity.
    pub fn add_device(&mut self, mut device: Device) -> AddOutcome {
        if self.get(&device.id).is_some() {
            tracing::warn!(device_id = %device.id, "device already exists in registry");
            return AddOutcome::AlreadyPresent;
        }
        Self::normalize(&mut device);

        tracing::debug!(device_id = %device.id, name = %device.name, "device added");
        self.devices.push(device);
        self.bump();
        AddOutcome::Inserted
    }

    /// Rename a device
    pub fn update_device_name(&mut self, id: &str, name: impl Into<String>) -> UpdateOutcome {
        let Some(device) = self.find_mut(id) else {
            return Self::missing(id, "rename");
        };
        device.name = name.into();
        self.bump();
        UpdateOutcome::Updated
    }

    /// Set the last-contact time of a device (epoch milliseconds)
    pub fn update_device_last_seen(&mut self, id: &str, timestamp: i64) -> UpdateOutcome {
        let Some(device) = self.find_mut(id) else {
            return Self::missing(id, "last_seen");
        };
        device.last_seen = timestamp;
        self.bump();
        UpdateOutcome::Updated
    }

    /// Record a message at the head of the device's log for its topic
    ///
    /// The log is created on first use and trimmed to capacity on every insert.
    pub fn record_message(&mut self, id: &str, message: impl Into<Message>) -> UpdateOutcome {
        let message = message.into();
        let topic = message.topic();
        let Some(device) = self.find_mut(id) else {
            return Self::missing(id, "record_message");
        };

        let evicted = device.log_mut(topic).push(message);
        if evicted > 0 {
            tracing::debug!(device_id = id, %topic, evicted, "evicted old messages");
        }
        self.bump();
        UpdateOutcome::Updated
    }

    /// Record a transport delivery received at `received_at`
    ///
    /// Stores the message and refreshes `last_seen`. Unknown devices are left
    /// alone, like [`Self::record_message`].
    ///
    /// # Errors
    ///
    /// Returns error if the payload does not match its topic
    pub fn apply(&mut self, delivery: Delivery, received_at: i64) -> Result<UpdateOutcome> {
        let (device_id, message) = delivery.into_parts()?;
        if self.record_message(&device_id, message) == UpdateOutcome::NotFound {
            return Ok(UpdateOutcome::NotFound);
        }
        Ok(self.update_device_last_seen(&device_id, received_at))
    }

    /// Current devices, in insertion order
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Get a device by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Number of known devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Watch the revision counter for committed changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Current revision; starts at zero and never decreases
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Write the full collection to `store`, replacing any earlier snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the collection cannot be encoded or the store fails
    pub fn persist<S: SnapshotStore + ?Sized>(&self, store: &S) -> Result<()> {
        let text = snapshot::encode(&self.devices)?;
        store.set(SNAPSHOT_KEY, &text)?;
        tracing::info!(devices = self.devices.len(), bytes = text.len(), "snapshot persisted");
        Ok(())
    }

    /// Read the raw snapshot from `store`, if one was ever persisted
    ///
    /// The text is returned undecoded; see [`snapshot::decode`].
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub fn restore<S: SnapshotStore + ?Sized>(store: &S) -> Result<Option<String>> {
        let text = store.get(SNAPSHOT_KEY)?;
        if text.is_none() {
            tracing::debug!("no snapshot stored");
        }
        Ok(text)
    }

    /// Build a registry seeded from the snapshot in `store`
    ///
    /// An absent snapshot seeds an empty registry.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the snapshot is invalid
    pub fn load<S: SnapshotStore + ?Sized>(store: &S) -> Result<Self> {
        let seed = match Self::restore(store)? {
            Some(text) => snapshot::decode(&text)?,
            None => Vec::new(),
        };
        let mut registry = Self::new();
        registry.initialize(seed);
        Ok(registry)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id == id)
    }

    fn normalize(device: &mut Device) {
        if device.normalize() {
            tracing::warn!(device_id = %device.id, "device logs exceeded limits, trimmed");
        }
    }

    fn missing(id: &str, op: &'static str) -> UpdateOutcome {
        tracing::debug!(device_id = id, op, "unknown device, ignoring");
        UpdateOutcome::NotFound
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}
