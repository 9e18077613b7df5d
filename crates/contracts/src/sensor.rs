//! SensorPacket - sensor callback output
//!
//! Raw sensor sample as delivered by the simulator.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::FileFormat;

/// Sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    RgbCamera,
    DepthCamera,
    Lidar,
    SemanticCamera,
}

impl SensorKind {
    /// CARLA blueprint name for this kind
    pub fn blueprint(self) -> &'static str {
        match self {
            Self::RgbCamera => "sensor.camera.rgb",
            Self::DepthCamera => "sensor.camera.depth",
            Self::Lidar => "sensor.lidar.ray_cast",
            Self::SemanticCamera => "sensor.camera.semantic_segmentation",
        }
    }

    /// Whether this kind produces images
    pub fn is_camera(self) -> bool {
        !matches!(self, Self::Lidar)
    }

    /// Format used when a profile does not name one
    pub fn default_format(self) -> FileFormat {
        if self.is_camera() {
            FileFormat::Jpeg
        } else {
            FileFormat::Ply
        }
    }
}

/// Sensor data packet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPacket {
    /// Sensor ID from the profile
    pub sensor_id: String,

    /// Sensor kind
    pub kind: SensorKind,

    /// Simulator frame number
    pub frame: u64,

    /// Simulation time (seconds)
    pub timestamp: f64,

    /// Data payload
    pub payload: SensorPayload,
}

/// Sensor data payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// Camera image (RGB/Depth/SemanticSeg), BGRA8 as CARLA delivers it
    Image(ImageData),

    /// LIDAR point cloud
    PointCloud(PointCloudData),
}

/// Image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// BGRA8 pixels, row-major, `width * height * 4` bytes
    pub data: Bytes,
}

impl ImageData {
    /// Expected byte length for the declared dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// LIDAR point cloud data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointCloudData {
    pub points: Vec<LidarPoint>,
}

/// A single LIDAR detection in sensor coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blueprints_per_kind() {
        assert_eq!(SensorKind::RgbCamera.blueprint(), "sensor.camera.rgb");
        assert_eq!(SensorKind::DepthCamera.blueprint(), "sensor.camera.depth");
        assert_eq!(SensorKind::Lidar.blueprint(), "sensor.lidar.ray_cast");
        assert_eq!(
            SensorKind::SemanticCamera.blueprint(),
            "sensor.camera.semantic_segmentation"
        );
    }

    #[test]
    fn only_lidar_is_not_a_camera() {
        assert!(SensorKind::RgbCamera.is_camera());
        assert!(SensorKind::SemanticCamera.is_camera());
        assert!(!SensorKind::Lidar.is_camera());
    }
}
