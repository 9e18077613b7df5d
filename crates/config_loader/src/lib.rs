//! # Config Loader
//!
//! Capture profile loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON profile files
//! - Validate profile legality
//! - Fall back to the builtin ego rig when no file is given
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let profile = ConfigLoader::load_from_path(Path::new("profile.toml")).unwrap();
//! println!("Vehicle: {}", profile.vehicle.blueprint);
//! ```

mod parser;
mod validator;

pub use contracts::CaptureProfile;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Profile loader
///
/// Provides static methods to load a profile from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the profile at `path`, or the builtin profile when `None`
    ///
    /// # Errors
    /// Same as [`ConfigLoader::load_from_path`]
    pub fn load(path: Option<&Path>) -> Result<CaptureProfile, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    /// The builtin ego rig
    pub fn builtin() -> CaptureProfile {
        CaptureProfile::default()
    }

    /// Load profile from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<CaptureProfile, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load profile from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CaptureProfile, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already constructed profile
    pub fn validate(profile: &CaptureProfile) -> Result<(), ContractError> {
        validator::validate(profile)
    }

    /// Serialize profile to TOML string
    pub fn to_toml(profile: &CaptureProfile) -> Result<String, ContractError> {
        toml::to_string_pretty(profile)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize profile to JSON string
    pub fn to_json(profile: &CaptureProfile) -> Result<String, ContractError> {
        serde_json::to_string_pretty(profile)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer profile format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read profile file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate profile content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CaptureProfile, ContractError> {
        let profile = parser::parse(content, format)?;
        validator::validate(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[vehicle]
blueprint = "vehicle.tesla.model3"

[[sensors]]
id = "front_camera"
kind = "rgb_camera"
[sensors.transform.location]
x = 2.0
y = 0.0
z = 1.0
[sensors.transform.rotation]
pitch = 0.0
yaw = 0.0
roll = 0.0
[sensors.attributes]
image_size_x = "1920"
image_size_y = "1080"
fov = "105"
[sensors.output]
subdir = "RGB"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let profile = result.unwrap();
        assert_eq!(profile.vehicle.blueprint, "vehicle.tesla.model3");
        assert_eq!(profile.sensors[0].attributes.len(), 3);
    }

    #[test]
    fn test_load_without_path_is_builtin() {
        let profile = ConfigLoader::load(None).unwrap();
        assert_eq!(profile.sensors.len(), 4);
    }

    #[test]
    fn test_builtin_round_trips_through_toml() {
        let builtin = ConfigLoader::builtin();
        let serialized = ConfigLoader::to_toml(&builtin).unwrap();
        let parsed = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.sensors.len(), builtin.sensors.len());
        assert_eq!(parsed.sensors[3].output.subdir, "2dSemantic");
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();

        let profile = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(profile.sensors[0].id, "front_camera");

        let yaml = dir.path().join("profile.yaml");
        std::fs::write(&yaml, MINIMAL_TOML).unwrap();
        let err = ConfigLoader::load_from_path(&yaml).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = format!(
            "{MINIMAL_TOML}\n{}",
            r#"
[[sensors]]
id = "front_camera"
kind = "lidar"
[sensors.transform.location]
x = 0.0
y = 0.0
z = 2.0
[sensors.output]
subdir = "LIDAR"
"#
        );
        let result = ConfigLoader::load_from_str(&content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("duplicate"));
    }
}
