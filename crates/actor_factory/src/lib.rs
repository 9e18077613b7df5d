//! # Actor Factory
//!
//! CARLA asset factory module.
//!
//! Responsibilities:
//! - Connect to the simulator and optionally start its recorder
//! - Spawn the ego vehicle and its sensors from a `CaptureProfile`
//! - Hand the vehicle to autopilot and move the spectator onto it
//! - Tear down every spawned actor on any exit path
//! - Provide unified `SensorSource` abstraction for real and mock sensors
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::{CarlaClient, SpawnRequest, TickSnapshot};
pub use contracts::{ActorId, ActorRegistry, SensorSource};
pub use error::{ActorFactoryError, Result};
pub use factory::{EgoFactory, TeardownReport, SENSOR_ROLE, VEHICLE_ROLE};
pub use mock_client::{MockActor, MockCall, MockCarlaClient, MockConfig};
pub use mock_sensor::{MockSensor, MockSensorConfig};

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::CarlaSensorSource;
