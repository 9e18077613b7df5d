//! CaptureProfile - Config Loader output
//!
//! Describes the ego vehicle and every sensor mounted on it, together with
//! where and how each sensor's frames are persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::SensorKind;

/// Profile version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProfileVersion {
    #[default]
    V1,
}

/// Complete capture profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CaptureProfile {
    #[serde(default)]
    pub version: ProfileVersion,

    /// Ego vehicle definition
    #[validate(nested)]
    pub vehicle: VehicleProfile,

    /// Sensors attached to the ego vehicle, spawned in order
    #[serde(default)]
    #[validate(nested)]
    pub sensors: Vec<SensorProfile>,
}

/// Ego vehicle definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VehicleProfile {
    /// Blueprint name (e.g., "vehicle.tesla.model3")
    #[validate(length(min = 1))]
    pub blueprint: String,

    /// Value written to the `role_name` attribute
    #[serde(default = "default_role_name")]
    #[validate(length(min = 1))]
    pub role_name: String,

    /// Pick a random recommended value for the `color` attribute
    #[serde(default = "default_true")]
    pub random_color: bool,
}

fn default_role_name() -> String {
    "ego".to_string()
}

fn default_true() -> bool {
    true
}

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    #[serde(default)]
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    /// Transform at `(x, y, z)` with no rotation
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(Location { x, y, z }, Rotation::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Sensor definition
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorProfile {
    /// Unique identifier, used in logs and metrics
    #[validate(length(min = 1))]
    pub id: String,

    /// Sensor kind, selects the blueprint
    pub kind: SensorKind,

    /// Mount pose relative to the vehicle
    pub transform: Transform,

    /// Blueprint attributes, all string-typed
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Where frames of this sensor are written
    #[validate(nested)]
    pub output: OutputProfile,
}

/// Per-sensor output route
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OutputProfile {
    /// Subdirectory under the output root
    #[validate(length(min = 1))]
    pub subdir: String,

    /// Post-processing applied to images before encoding
    #[serde(default)]
    pub converter: ColorConverter,

    /// File format; inferred from the sensor kind when absent
    #[serde(default)]
    pub format: Option<FileFormat>,
}

impl OutputProfile {
    /// Resolve the file format for a sensor of `kind`
    pub fn format_for(&self, kind: SensorKind) -> FileFormat {
        self.format.unwrap_or_else(|| kind.default_format())
    }
}

/// Image post-processing applied before a frame is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorConverter {
    /// Write pixels as delivered
    #[default]
    Raw,
    /// Linear depth, gray
    Depth,
    /// Logarithmic depth, gray
    LogarithmicDepth,
    /// Semantic tags mapped through the CityScapes palette
    CityScapesPalette,
}

/// On-disk frame format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Jpeg,
    Png,
    Ply,
}

impl FileFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Ply => "ply",
        }
    }

    /// Whether this format stores images (as opposed to point clouds)
    pub fn is_image(self) -> bool {
        !matches!(self, Self::Ply)
    }
}

/// File name for a frame: the frame number zero-padded to six digits
pub fn frame_file_name(frame: u64, format: FileFormat) -> String {
    format!("{:06}.{}", frame, format.extension())
}

impl CaptureProfile {
    /// Find a sensor definition by ID
    pub fn sensor(&self, id: &str) -> Option<&SensorProfile> {
        self.sensors.iter().find(|sensor| sensor.id == id)
    }
}

impl Default for CaptureProfile {
    /// The stock ego rig: a Model 3 carrying RGB, log-depth, LIDAR and
    /// semantic cameras.
    fn default() -> Self {
        let camera_mount = Transform::at(2.0, 0.0, 1.0);
        let camera_attributes = attributes(&[
            ("image_size_x", "1920"),
            ("image_size_y", "1080"),
            ("fov", "105"),
        ]);

        Self {
            version: ProfileVersion::V1,
            vehicle: VehicleProfile {
                blueprint: "vehicle.tesla.model3".to_string(),
                role_name: default_role_name(),
                random_color: true,
            },
            sensors: vec![
                SensorProfile {
                    id: "rgb_camera".to_string(),
                    kind: SensorKind::RgbCamera,
                    transform: camera_mount,
                    attributes: camera_attributes.clone(),
                    output: OutputProfile {
                        subdir: "RGB".to_string(),
                        converter: ColorConverter::Raw,
                        format: Some(FileFormat::Jpeg),
                    },
                },
                SensorProfile {
                    id: "depth_camera".to_string(),
                    kind: SensorKind::DepthCamera,
                    transform: camera_mount,
                    attributes: camera_attributes.clone(),
                    output: OutputProfile {
                        subdir: "LogDepth".to_string(),
                        converter: ColorConverter::LogarithmicDepth,
                        format: Some(FileFormat::Jpeg),
                    },
                },
                SensorProfile {
                    id: "lidar".to_string(),
                    kind: SensorKind::Lidar,
                    transform: Transform::at(0.0, 0.0, 2.0),
                    attributes: attributes(&[
                        ("channels", "40"),
                        ("points_per_second", "120000"),
                        ("rotation_frequency", "40"),
                        ("range", "40"),
                    ]),
                    output: OutputProfile {
                        subdir: "LIDAR".to_string(),
                        converter: ColorConverter::Raw,
                        format: Some(FileFormat::Ply),
                    },
                },
                SensorProfile {
                    id: "semantic_camera".to_string(),
                    kind: SensorKind::SemanticCamera,
                    transform: camera_mount,
                    attributes: camera_attributes,
                    output: OutputProfile {
                        subdir: "2dSemantic".to_string(),
                        converter: ColorConverter::CityScapesPalette,
                        format: Some(FileFormat::Jpeg),
                    },
                },
            ],
        }
    }
}

fn attributes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_file_name_is_zero_padded() {
        assert_eq!(frame_file_name(0, FileFormat::Jpeg), "000000.jpg");
        assert_eq!(frame_file_name(42, FileFormat::Ply), "000042.ply");
        assert_eq!(frame_file_name(123456, FileFormat::Jpeg), "123456.jpg");
    }

    #[test]
    fn frame_file_name_keeps_wide_frames() {
        // Six digits is a minimum width, not a truncation
        assert_eq!(frame_file_name(1234567, FileFormat::Png), "1234567.png");
    }

    #[test]
    fn default_profile_matches_stock_rig() {
        let profile = CaptureProfile::default();
        assert_eq!(profile.vehicle.blueprint, "vehicle.tesla.model3");
        assert_eq!(profile.vehicle.role_name, "ego");
        assert_eq!(profile.sensors.len(), 4);

        let subdirs: Vec<_> = profile
            .sensors
            .iter()
            .map(|s| s.output.subdir.as_str())
            .collect();
        assert_eq!(subdirs, ["RGB", "LogDepth", "LIDAR", "2dSemantic"]);

        let depth = profile.sensor("depth_camera").unwrap();
        assert_eq!(depth.output.converter, ColorConverter::LogarithmicDepth);
        assert_eq!(depth.attributes["fov"], "105");

        let semantic = profile.sensor("semantic_camera").unwrap();
        assert_eq!(semantic.output.converter, ColorConverter::CityScapesPalette);

        let lidar = profile.sensor("lidar").unwrap();
        assert_eq!(lidar.output.format_for(lidar.kind), FileFormat::Ply);
        assert_eq!(lidar.attributes["points_per_second"], "120000");
        assert_eq!(lidar.transform.location.z, 2.0);
    }

    #[test]
    fn default_profile_passes_field_validation() {
        assert!(CaptureProfile::default().validate().is_ok());
    }

    #[test]
    fn format_falls_back_to_sensor_kind() {
        let output = OutputProfile {
            subdir: "x".into(),
            converter: ColorConverter::Raw,
            format: None,
        };
        assert_eq!(output.format_for(SensorKind::Lidar), FileFormat::Ply);
        assert_eq!(output.format_for(SensorKind::RgbCamera), FileFormat::Jpeg);
    }

    #[test]
    fn profile_json_uses_snake_case_enums() {
        let json = serde_json::to_string(&CaptureProfile::default()).unwrap();
        assert!(json.contains("\"logarithmic_depth\""));
        assert!(json.contains("\"city_scapes_palette\""));
        assert!(json.contains("\"semantic_camera\""));
    }
}
