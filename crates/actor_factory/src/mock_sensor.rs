//! Mock sensor implementation
//!
//! Implements `SensorSource` trait, generates simulated sensor data.
//! Frames are pushed by `MockCarlaClient` on every tick, so tests can count
//! exactly what each sensor produced.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{
    ImageData, LidarPoint, PointCloudData, SensorDataCallback, SensorKind, SensorPacket,
    SensorPayload, SensorSource,
};
use tracing::{debug, trace};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Image width (cameras only)
    pub image_width: u32,
    /// Image height (cameras only)
    pub image_height: u32,
    /// Points per sweep (LIDAR only)
    pub lidar_points: u32,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            image_width: 64,
            image_height: 48,
            lidar_points: 256,
        }
    }
}

/// Mock sensor
///
/// Cloning yields another handle to the same sensor: the client keeps one to
/// drive `emit`, the caller owns the other as its `SensorSource`.
#[derive(Clone)]
pub struct MockSensor {
    sensor_id: String,
    kind: SensorKind,
    config: MockSensorConfig,
    listening: Arc<AtomicBool>,
    callback: Arc<Mutex<Option<SensorDataCallback>>>,
}

impl MockSensor {
    /// Create new Mock sensor
    pub fn new(sensor_id: impl Into<String>, kind: SensorKind, config: MockSensorConfig) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            kind,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Create Mock sensor with default configuration
    pub fn with_defaults(sensor_id: impl Into<String>, kind: SensorKind) -> Self {
        Self::new(sensor_id, kind, MockSensorConfig::default())
    }

    /// Deliver one frame to the registered callback
    ///
    /// Returns false if the sensor is not listening.
    pub fn emit(&self, frame: u64, timestamp: f64) -> bool {
        if !self.listening.load(Ordering::SeqCst) {
            return false;
        }
        let callback = match self
            .callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            Some(callback) => callback,
            None => return false,
        };

        let packet = SensorPacket {
            sensor_id: self.sensor_id.clone(),
            kind: self.kind,
            frame,
            timestamp,
            payload: generate_payload(&self.config, self.kind, frame),
        };
        callback(packet);

        trace!(sensor_id = %self.sensor_id, frame, timestamp, "mock packet sent");
        true
    }
}

/// Generate simulated data payload
///
/// Cameras produce BGRA8 in the encoding the real sensor uses: depth packs a
/// 24-bit distance into R/G/B, semantic stores the class tag in R.
fn generate_payload(config: &MockSensorConfig, kind: SensorKind, frame: u64) -> SensorPayload {
    if kind == SensorKind::Lidar {
        return SensorPayload::PointCloud(lidar_sweep(config.lidar_points, frame));
    }

    let (width, height) = (config.image_width, config.image_height);
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let shade = ((x + y) as u64 + frame) as u8;
            let bgra = match kind {
                SensorKind::DepthCamera => {
                    // Farther toward the top of the image
                    let depth = u64::from(height - y) * 0xFFFF / u64::from(height.max(1));
                    [(depth & 0xFF) as u8, (depth >> 8) as u8, 0, 255]
                }
                SensorKind::SemanticCamera => [0, 0, ((x / 8 + y / 8) % 23) as u8, 255],
                _ => [shade, shade.wrapping_mul(3), shade.wrapping_add(64), 255],
            };
            data.extend_from_slice(&bgra);
        }
    }

    SensorPayload::Image(ImageData {
        width,
        height,
        data: Bytes::from(data),
    })
}

fn lidar_sweep(points: u32, frame: u64) -> PointCloudData {
    let phase = (frame % 360) as f32 / 360.0 * TAU;
    let points = (0..points)
        .map(|i| {
            let angle = phase + i as f32 / points.max(1) as f32 * TAU;
            let range = 10.0 + (i % 7) as f32;
            LidarPoint {
                x: range * angle.cos(),
                y: range * angle.sin(),
                z: -1.5 + (i % 40) as f32 * 0.05,
                intensity: 1.0 - range / 40.0,
            }
        })
        .collect();
    PointCloudData { points }
}

impl SensorSource for MockSensor {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.callback.lock().unwrap_or_else(|e| e.into_inner()) = Some(callback);
        debug!(sensor_id = %self.sensor_id, kind = ?self.kind, "mock sensor started");
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            self.callback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            debug!(sensor_id = %self.sensor_id, "mock sensor stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    fn counting_callback(count: &Arc<AtomicU64>) -> SensorDataCallback {
        let count = count.clone();
        Arc::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_requires_listen() {
        let sensor = MockSensor::with_defaults("rgb", SensorKind::RgbCamera);
        assert!(!sensor.emit(1, 0.05));

        let count = Arc::new(AtomicU64::new(0));
        sensor.listen(counting_callback(&count));
        assert!(sensor.emit(1, 0.05));
        assert!(sensor.emit(2, 0.10));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_camera_packet_shape() {
        let sensor = MockSensor::new(
            "front",
            SensorKind::RgbCamera,
            MockSensorConfig {
                image_width: 8,
                image_height: 4,
                ..Default::default()
            },
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sensor.listen(Arc::new(move |packet| sink.lock().unwrap().push(packet)));

        sensor.emit(42, 2.1);

        let packets = seen.lock().unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].sensor_id, "front");
        assert_eq!(packets[0].frame, 42);
        match &packets[0].payload {
            SensorPayload::Image(image) => {
                assert_eq!((image.width, image.height), (8, 4));
                assert_eq!(image.data.len(), image.expected_len());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_depth_tall_image() {
        let config = MockSensorConfig {
            image_width: 1,
            image_height: 70_000,
            ..Default::default()
        };
        let SensorPayload::Image(image) = generate_payload(&config, SensorKind::DepthCamera, 1)
        else {
            panic!("depth camera must produce an image");
        };

        let depth_at = |y: usize| {
            let px = &image.data[y * 4..y * 4 + 4];
            u32::from(px[0]) | u32::from(px[1]) << 8
        };
        assert_eq!(depth_at(0), 0xFFFF);
        assert!(depth_at(69_999) < depth_at(35_000));
        assert!(depth_at(35_000) < depth_at(0));
    }

    #[test]
    fn test_lidar_packet_shape() {
        let sensor = MockSensor::with_defaults("lidar", SensorKind::Lidar);
        let points = Arc::new(AtomicU64::new(0));
        let seen = points.clone();
        sensor.listen(Arc::new(move |packet| {
            if let SensorPayload::PointCloud(cloud) = packet.payload {
                seen.store(cloud.points.len() as u64, Ordering::SeqCst);
            }
        }));

        sensor.emit(1, 0.0);
        assert_eq!(points.load(Ordering::SeqCst), 256);
    }

    #[test]
    fn test_semantic_tags_stay_in_palette() {
        let payload = generate_payload(&MockSensorConfig::default(), SensorKind::SemanticCamera, 3);
        let SensorPayload::Image(image) = payload else {
            panic!("expected image");
        };
        assert!(image.data.chunks_exact(4).all(|px| px[2] < 23));
    }

    #[test]
    fn test_idempotent_listen() {
        let sensor = MockSensor::with_defaults("test", SensorKind::RgbCamera);

        let first = Arc::new(AtomicU64::new(0));
        let second = Arc::new(AtomicU64::new(0));
        sensor.listen(counting_callback(&first));
        // Second call should be ignored
        sensor.listen(counting_callback(&second));

        sensor.emit(1, 0.0);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stop_silences_sensor() {
        let sensor = MockSensor::with_defaults("test", SensorKind::Lidar);
        let count = Arc::new(AtomicU64::new(0));
        sensor.listen(counting_callback(&count));

        let handle = sensor.clone();
        handle.stop();
        // Stopping twice is a no-op
        handle.stop();

        assert!(!sensor.is_listening());
        assert!(!sensor.emit(1, 0.0));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
