//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (非空 blueprint / id / subdir)，由 `validator` derive 提供
//! - sensor_id 唯一
//! - 输出子目录唯一
//! - 子目录为单层相对路径
//! - 转换器与传感器类型匹配

use std::collections::HashSet;
use std::path::{Component, Path};

use contracts::{CaptureProfile, ColorConverter, ContractError, SensorKind};
use validator::Validate;

/// 校验 CaptureProfile 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(profile: &CaptureProfile) -> Result<(), ContractError> {
    validate_fields(profile)?;
    validate_sensor_ids(profile)?;
    validate_output_subdirs(profile)?;
    validate_converters(profile)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(profile: &CaptureProfile) -> Result<(), ContractError> {
    profile
        .validate()
        .map_err(|e| ContractError::config_validation("profile", e.to_string()))
}

/// 校验 sensor_id 唯一性
fn validate_sensor_ids(profile: &CaptureProfile) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sensor in &profile.sensors {
        if !seen.insert(&sensor.id) {
            return Err(ContractError::config_validation(
                format!("sensors[id={}]", sensor.id),
                "duplicate sensor_id",
            ));
        }
    }
    Ok(())
}

/// 校验输出子目录：唯一且不能逃出输出根目录
fn validate_output_subdirs(profile: &CaptureProfile) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for sensor in &profile.sensors {
        let subdir = &sensor.output.subdir;
        let mut components = Path::new(subdir).components();
        let single_normal = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !single_normal {
            return Err(ContractError::config_validation(
                format!("sensors[{}].output.subdir", sensor.id),
                format!("'{subdir}' must be a single relative directory name"),
            ));
        }
        if !seen.insert(subdir) {
            return Err(ContractError::config_validation(
                format!("sensors[{}].output.subdir", sensor.id),
                format!("duplicate output subdir '{subdir}'"),
            ));
        }
    }
    Ok(())
}

/// 校验转换器与传感器类型、文件格式匹配
fn validate_converters(profile: &CaptureProfile) -> Result<(), ContractError> {
    for sensor in &profile.sensors {
        let field = format!("sensors[{}].output", sensor.id);
        let format = sensor.output.format_for(sensor.kind);

        if sensor.kind.is_camera() != format.is_image() {
            return Err(ContractError::config_validation(
                field,
                format!(
                    "format {:?} cannot store {:?} frames",
                    format, sensor.kind
                ),
            ));
        }

        let allowed = match sensor.output.converter {
            ColorConverter::Raw => true,
            ColorConverter::Depth | ColorConverter::LogarithmicDepth => {
                sensor.kind == SensorKind::DepthCamera
            }
            ColorConverter::CityScapesPalette => sensor.kind == SensorKind::SemanticCamera,
        };
        if !allowed {
            return Err(ContractError::config_validation(
                field,
                format!(
                    "converter {:?} does not apply to {:?}",
                    sensor.output.converter, sensor.kind
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FileFormat;

    #[test]
    fn test_default_profile_is_valid() {
        assert!(validate(&CaptureProfile::default()).is_ok());
    }

    #[test]
    fn test_empty_vehicle_blueprint() {
        let mut profile = CaptureProfile::default();
        profile.vehicle.blueprint = String::new();
        let err = validate(&profile).unwrap_err().to_string();
        assert!(err.contains("blueprint"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sensor_id() {
        let mut profile = CaptureProfile::default();
        let mut dup = profile.sensors[0].clone();
        dup.output.subdir = "RGB2".into();
        profile.sensors.push(dup);
        let err = validate(&profile).unwrap_err().to_string();
        assert!(err.contains("duplicate sensor_id"), "got: {err}");
    }

    #[test]
    fn test_duplicate_subdir() {
        let mut profile = CaptureProfile::default();
        profile.sensors[1].output.subdir = "RGB".into();
        let err = validate(&profile).unwrap_err().to_string();
        assert!(err.contains("duplicate output subdir"), "got: {err}");
    }

    #[test]
    fn test_subdir_cannot_escape_root() {
        for bad in ["../RGB", "/tmp/RGB", "a/b"] {
            let mut profile = CaptureProfile::default();
            profile.sensors[0].output.subdir = bad.into();
            let err = validate(&profile).unwrap_err().to_string();
            assert!(err.contains("single relative directory"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_palette_only_for_semantic_camera() {
        let mut profile = CaptureProfile::default();
        profile.sensors[0].output.converter = ColorConverter::CityScapesPalette;
        let err = validate(&profile).unwrap_err().to_string();
        assert!(err.contains("does not apply"), "got: {err}");
    }

    #[test]
    fn test_lidar_needs_point_cloud_format() {
        let mut profile = CaptureProfile::default();
        let lidar = profile
            .sensors
            .iter_mut()
            .find(|s| s.kind == SensorKind::Lidar)
            .unwrap();
        lidar.output.format = Some(FileFormat::Jpeg);
        let err = validate(&profile).unwrap_err().to_string();
        assert!(err.contains("cannot store"), "got: {err}");
    }
}
