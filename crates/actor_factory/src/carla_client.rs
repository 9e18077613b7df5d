//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, World};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use contracts::{ActorId, Location, Rotation, SensorKind, SensorSource, Transform};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::{CarlaClient, SpawnRequest, TickSnapshot};
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements CarlaClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    /// CARLA client
    client: Arc<Mutex<Option<Client>>>,
    /// World reference (uses Mutex for interior mutability)
    world: Arc<Mutex<Option<World>>>,
    /// Created actors list (for teardown)
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
}

/// Actor type enumeration
#[derive(Clone)]
enum ActorType {
    Vehicle(Vehicle),
    Sensor(Sensor),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = lock(&self.world);
        let world = world_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::connection("not connected to CARLA server"))?;
        f(world)
    }

    /// Access Client with mutable reference, ensuring connected
    fn with_client_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Client) -> Result<R>,
    {
        let mut client_guard = lock(&self.client);
        let client = client_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::connection("not connected to CARLA server"))?;
        f(client)
    }

    /// Save actor to registry for teardown
    fn store_actor(&self, actor_id: ActorId, actor: ActorType) {
        lock(&self.actors).insert(actor_id, actor);
    }

    fn parent_vehicle(&self, request: &SpawnRequest, parent_id: ActorId) -> Result<Vehicle> {
        match lock(&self.actors).get(&parent_id) {
            Some(ActorType::Vehicle(v)) => Ok(v.clone()),
            _ => Err(ActorFactoryError::spawn(
                &request.blueprint,
                &request.blueprint,
                format!("parent vehicle {parent_id} not found"),
            )),
        }
    }

    fn create_actor(
        world: &mut World,
        request: &SpawnRequest,
        parent: Option<&Vehicle>,
    ) -> Result<ActorType> {
        let blueprint = request.blueprint.as_str();
        let mut actor_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
            ActorFactoryError::BlueprintNotFound {
                blueprint: blueprint.to_string(),
            }
        })?;

        for (key, value) in &request.attributes {
            if !actor_bp.set_attribute(key, value) {
                warn!(key, value, "failed to set blueprint attribute");
            }
        }

        let transform = to_carla_transform(&request.transform);
        let actor = match parent {
            Some(parent) => world.spawn_actor_attached(&actor_bp, &transform, parent, None),
            None => world.spawn_actor(&actor_bp, &transform),
        }
        .map_err(|e| ActorFactoryError::spawn(blueprint, blueprint, e.to_string()))?;

        if blueprint.starts_with("sensor.") {
            Sensor::try_from(actor).map(ActorType::Sensor).map_err(|_| {
                ActorFactoryError::spawn(blueprint, blueprint, "spawned actor is not a sensor")
            })
        } else {
            Vehicle::try_from(actor).map(ActorType::Vehicle).map_err(|_| {
                ActorFactoryError::spawn(blueprint, blueprint, "spawned actor is not a vehicle")
            })
        }
    }

    fn destroy_vehicle_actor(vehicle: Vehicle, actor_id: ActorId) -> Result<()> {
        if vehicle.destroy() {
            Ok(())
        } else {
            Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "destroy vehicle returned false".into(),
            })
        }
    }

    fn destroy_sensor_actor(sensor: Sensor, actor_id: ActorId) -> Result<()> {
        if sensor.is_listening() {
            sensor.stop();
        }
        if sensor.destroy() {
            Ok(())
        } else {
            Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "destroy sensor returned false".into(),
            })
        }
    }

    /// Get underlying CARLA Sensor object
    pub fn get_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Sensor(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }

    fn get_vehicle(&self, actor_id: ActorId) -> Result<Vehicle> {
        match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Vehicle(vehicle)) => Ok(vehicle.clone()),
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }
}

/// Convert internal Transform to CARLA Transform
fn to_carla_transform(transform: &Transform) -> CarlaTransform {
    CarlaTransform {
        location: CarlaLocation {
            x: transform.location.x as f32,
            y: transform.location.y as f32,
            z: transform.location.z as f32,
        },
        rotation: CarlaRotation {
            pitch: transform.rotation.pitch as f32,
            yaw: transform.rotation.yaw as f32,
            roll: transform.rotation.roll as f32,
        },
    }
}

/// Convert CARLA Transform to internal Transform
fn from_carla_transform(transform: &CarlaTransform) -> Transform {
    Transform::new(
        Location {
            x: transform.location.x as f64,
            y: transform.location.y as f64,
            z: transform.location.z as f64,
        },
        Rotation {
            pitch: transform.rotation.pitch as f64,
            yaw: transform.rotation.yaw as f64,
            roll: transform.rotation.roll as f64,
        },
    )
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self, timeout), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        let world = client.world();

        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);

        Ok(())
    }

    #[instrument(name = "real_carla_start_recorder", skip(self))]
    async fn start_recorder(&self, path: &str) -> Result<()> {
        self.with_client_mut(|client| {
            let reply = client.start_recorder(path, false);
            debug!(reply = %reply, "recorder started");
            Ok(())
        })
    }

    #[instrument(name = "real_carla_stop_recorder", skip(self))]
    async fn stop_recorder(&self) -> Result<()> {
        self.with_client_mut(|client| {
            client.stop_recorder();
            Ok(())
        })
    }

    async fn recommended_values(&self, blueprint: &str, attribute: &str) -> Result<Vec<String>> {
        self.with_world_mut(|world| {
            let actor_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::BlueprintNotFound {
                    blueprint: blueprint.to_string(),
                }
            })?;
            Ok(actor_bp
                .attribute(attribute)
                .map(|attr| {
                    attr.recommended_values()
                        .into_iter()
                        .map(|v| v.to_string())
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            let points = world.map().recommended_spawn_points();
            Ok((0..points.len())
                .filter_map(|i| points.get(i).map(from_carla_transform))
                .collect())
        })
    }

    #[instrument(
        name = "real_carla_spawn_actor",
        skip(self, request),
        fields(blueprint = %request.blueprint, parent = ?request.parent)
    )]
    async fn spawn_actor(&self, request: &SpawnRequest) -> Result<ActorId> {
        let parent = request
            .parent
            .map(|parent_id| self.parent_vehicle(request, parent_id))
            .transpose()?;
        let actor = self.with_world_mut(|world| Self::create_actor(world, request, parent.as_ref()))?;

        let actor_id = match &actor {
            ActorType::Vehicle(v) => v.id(),
            ActorType::Sensor(s) => s.id(),
        };
        debug!(actor_id, "actor spawned");
        self.store_actor(actor_id, actor);

        Ok(actor_id)
    }

    #[instrument(name = "real_carla_set_autopilot", skip(self))]
    async fn set_autopilot(&self, vehicle_id: ActorId, enabled: bool) -> Result<()> {
        let vehicle = self.get_vehicle(vehicle_id)?;
        vehicle.set_autopilot(enabled);
        info!(vehicle_id, enabled, "autopilot updated");
        Ok(())
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        let transform = match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Vehicle(v)) => v.transform(),
            Some(ActorType::Sensor(s)) => s.transform(),
            None => return Err(ActorFactoryError::ActorNotFound { actor_id }),
        };
        Ok(from_carla_transform(&transform))
    }

    async fn set_spectator_transform(&self, transform: Transform) -> Result<()> {
        self.with_world_mut(|world| {
            world.spectator().set_transform(&to_carla_transform(&transform));
            Ok(())
        })
    }

    async fn wait_for_tick(&self) -> Result<TickSnapshot> {
        // wait_for_tick blocks until the server advances a frame
        tokio::task::block_in_place(|| {
            self.with_world_mut(|world| {
                let snapshot = world.wait_for_tick();
                Ok(TickSnapshot {
                    frame: snapshot.frame() as u64,
                    elapsed_seconds: snapshot.timestamp().elapsed_seconds,
                })
            })
        })
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let actor = lock(&self.actors).remove(&actor_id);

        // Idempotent: return Ok even if not exists
        let Some(actor) = actor else {
            return Ok(());
        };
        match actor {
            ActorType::Vehicle(v) => Self::destroy_vehicle_actor(v, actor_id)?,
            ActorType::Sensor(s) => Self::destroy_sensor_actor(s, actor_id)?,
        }
        debug!(actor_id, "actor destroyed");
        Ok(())
    }

    fn sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.get_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, kind, sensor)))
    }
}

#[cfg(test)]
mod tests {
    // Real client tests require CARLA server running
    // These tests are marked as ignore, only run when server is available

    use super::*;

    #[test]
    fn test_transform_conversion() {
        let transform = Transform::new(
            Location {
                x: 2.0,
                y: -1.0,
                z: 1.5,
            },
            Rotation {
                pitch: -10.0,
                yaw: 90.0,
                roll: 0.0,
            },
        );
        assert_eq!(from_carla_transform(&to_carla_transform(&transform)), transform);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires CARLA server"]
    async fn test_real_client_connect() {
        let mut client = RealCarlaClient::new();
        client
            .connect("127.0.0.1", 2000, Duration::from_secs(10))
            .await
            .unwrap();
        assert!(!client.spawn_points().await.unwrap().is_empty());
    }
}
