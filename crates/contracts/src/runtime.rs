//! ActorRegistry - Actor Factory output
//!
//! Holds every handle spawned during setup so teardown can find them on any
//! exit path. An empty slot means the actor was never spawned.

use std::fmt;

use crate::{SensorKind, SensorSource};

/// CARLA actor handle type
pub type ActorId = u32;

/// A spawned sensor and its subscription handle
pub struct SensorHandle {
    /// Sensor ID from the profile
    pub sensor_id: String,

    /// Sensor kind
    pub kind: SensorKind,

    /// Simulator actor handle
    pub actor_id: ActorId,

    /// Subscription handle, `None` if the client could not provide one
    pub source: Option<Box<dyn SensorSource>>,
}

impl fmt::Debug for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorHandle")
            .field("sensor_id", &self.sensor_id)
            .field("kind", &self.kind)
            .field("actor_id", &self.actor_id)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Runtime actor registry
///
/// Created empty before connecting, filled by provisioning, drained by
/// teardown.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    vehicle: Option<ActorId>,
    sensors: Vec<SensorHandle>,
    recording: Option<String>,
}

impl ActorRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the ego vehicle
    pub fn set_vehicle(&mut self, actor_id: ActorId) {
        self.vehicle = Some(actor_id);
    }

    /// Ego vehicle handle, if one was spawned
    pub fn vehicle(&self) -> Option<ActorId> {
        self.vehicle
    }

    /// Register a spawned sensor
    pub fn register_sensor(&mut self, handle: SensorHandle) {
        self.sensors.push(handle);
    }

    /// Spawned sensors in spawn order
    pub fn sensors(&self) -> &[SensorHandle] {
        &self.sensors
    }

    /// Look up a sensor by profile ID
    pub fn sensor(&self, sensor_id: &str) -> Option<&SensorHandle> {
        self.sensors.iter().find(|s| s.sensor_id == sensor_id)
    }

    /// Mark the simulator recorder as active
    pub fn set_recording(&mut self, path: impl Into<String>) {
        self.recording = Some(path.into());
    }

    /// Recorder output path, if recording is active
    pub fn recording(&self) -> Option<&str> {
        self.recording.as_deref()
    }

    /// Take the vehicle handle, leaving the slot empty
    pub fn take_vehicle(&mut self) -> Option<ActorId> {
        self.vehicle.take()
    }

    /// Take all sensor handles, leaving the registry without sensors
    pub fn take_sensors(&mut self) -> Vec<SensorHandle> {
        std::mem::take(&mut self.sensors)
    }

    /// Clear the recording flag, returning the path if it was set
    pub fn take_recording(&mut self) -> Option<String> {
        self.recording.take()
    }

    /// Number of live actor handles
    pub fn actor_count(&self) -> usize {
        self.sensors.len() + usize::from(self.vehicle.is_some())
    }

    /// True if nothing needs tearing down
    pub fn is_empty(&self) -> bool {
        self.actor_count() == 0 && self.recording.is_none()
    }

    /// All actor handles, sensors first (teardown order)
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.sensors
            .iter()
            .map(|s| s.actor_id)
            .chain(self.vehicle)
            .collect()
    }
}
