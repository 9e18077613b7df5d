//! CARLA Sensor SensorSource wrapper
//!
//! Wraps CARLA native Sensor as a type implementing `SensorSource` trait.
//! Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carla::client::Sensor;
use contracts::{SensorDataCallback, SensorKind, SensorSource};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_sensor_data;

/// CARLA Sensor wrapper
///
/// Lets the capture session subscribe to real sensors and mock sensors the
/// same way.
pub struct CarlaSensorSource {
    sensor_id: String,
    kind: SensorKind,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    /// Create new CARLA sensor source
    pub fn new(sensor_id: String, kind: SensorKind, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            kind,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(sensor_id = %self.sensor_id, "sensor already listening");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let kind = self.kind;
        let listening = self.listening.clone();

        debug!(sensor_id = %sensor_id, kind = ?kind, "starting CARLA sensor");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_sensor_data(&sensor_id, kind, &sensor_data) {
                Some(packet) => {
                    trace!(sensor_id = %sensor_id, frame = packet.frame, "CARLA sensor data received");
                    callback(packet);
                }
                None => {
                    warn!(sensor_id = %sensor_id, "unexpected sensor data type");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor_id = %self.sensor_id, "stopping CARLA sensor");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
