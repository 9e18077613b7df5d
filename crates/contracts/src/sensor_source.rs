//! SensorSource trait - sensor subscription abstraction
//!
//! A sensor is subscribed once and then delivers packets on a thread owned
//! by the simulator client, until it is stopped. Real CARLA sensors and mock
//! sensors share this interface.

use std::sync::Arc;

use crate::{SensorKind, SensorPacket};

/// Sensor data callback type
///
/// Invoked once per produced frame, from whatever thread the sensor
/// implementation chooses.
pub type SensorDataCallback = Arc<dyn Fn(SensorPacket) + Send + Sync>;

/// Sensor data source trait
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = client.sensor_source(actor_id, id, kind)?;
/// sensor.listen(Arc::new(|packet| {
///     println!("frame {} from {}", packet.frame, packet.sensor_id);
/// }));
/// // ... idle ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Sensor ID
    fn sensor_id(&self) -> &str;

    /// Sensor kind
    fn kind(&self) -> SensorKind;

    /// Register data callback
    ///
    /// Repeated calls while already listening are ignored; the first
    /// callback stays registered.
    fn listen(&self, callback: SensorDataCallback);

    /// Stop listening
    ///
    /// No further callbacks are delivered after this returns. Stopping a
    /// sensor that is not listening is a no-op.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
