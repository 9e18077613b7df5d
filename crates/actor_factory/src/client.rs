//! CARLA client abstraction
//!
//! Defines traits for interacting with CARLA, supporting real implementation and mock testing.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use contracts::{ActorId, SensorKind, SensorSource, Transform};

use crate::error::Result;

/// Parameters for one actor spawn
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Blueprint name, e.g. "vehicle.tesla.model3"
    pub blueprint: String,
    /// Blueprint attributes set before spawning
    pub attributes: BTreeMap<String, String>,
    /// World pose, or pose relative to `parent`
    pub transform: Transform,
    /// Parent actor for attached spawns
    pub parent: Option<ActorId>,
}

impl SpawnRequest {
    pub fn new(blueprint: impl Into<String>, transform: Transform) -> Self {
        Self {
            blueprint: blueprint.into(),
            attributes: BTreeMap::new(),
            transform,
            parent: None,
        }
    }

    /// Set one blueprint attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attach the spawned actor to `parent`
    pub fn attached_to(mut self, parent: ActorId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// World state observed after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSnapshot {
    /// Simulator frame number
    pub frame: u64,
    /// Elapsed simulation time in seconds
    pub elapsed_seconds: f64,
}

/// CARLA client trait
///
/// Abstracts CARLA core operations for testing and future implementation replacement.
/// Supports unified interface for real CARLA client and Mock client.
pub trait CarlaClient: Send + Sync {
    /// Connect to CARLA server and obtain the current world
    ///
    /// `timeout` bounds every subsequent request.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Start the simulator-side recorder writing to `path`
    fn start_recorder(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Stop the simulator-side recorder
    fn stop_recorder(&self) -> impl Future<Output = Result<()>> + Send;

    /// Recommended values of a blueprint attribute
    ///
    /// Empty if the blueprint has no such attribute.
    fn recommended_values(
        &self,
        blueprint: &str,
        attribute: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Recommended spawn points of the current map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Spawn an actor, attached to `request.parent` if set
    ///
    /// # Returns
    /// Newly created actor ID
    fn spawn_actor(&self, request: &SpawnRequest) -> impl Future<Output = Result<ActorId>> + Send;

    /// Hand a vehicle over to the simulator's traffic manager
    fn set_autopilot(
        &self,
        vehicle_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current world transform of an actor
    fn actor_transform(&self, actor_id: ActorId) -> impl Future<Output = Result<Transform>> + Send;

    /// Move the spectator camera
    fn set_spectator_transform(
        &self,
        transform: Transform,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Block until the simulator advances one tick
    fn wait_for_tick(&self) -> impl Future<Output = Result<TickSnapshot>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Get sensor data source
    ///
    /// Returns an object implementing `SensorSource`. This is the core
    /// interface for unifying Mock and Real sensors.
    ///
    /// # Arguments
    /// * `actor_id` - Sensor's actor ID
    /// * `sensor_id` - Sensor profile ID (for logging and tracing)
    /// * `kind` - Sensor kind
    ///
    /// # Returns
    /// Boxed trait object implementing `SensorSource`, None if actor doesn't exist
    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_request_builder() {
        let request = SpawnRequest::new("sensor.camera.rgb", Transform::at(2.0, 0.0, 1.0))
            .with_attribute("fov", "105")
            .with_attribute("fov", "90")
            .attached_to(7);

        assert_eq!(request.blueprint, "sensor.camera.rgb");
        assert_eq!(request.attributes.get("fov").map(String::as_str), Some("90"));
        assert_eq!(request.parent, Some(7));
    }
}
