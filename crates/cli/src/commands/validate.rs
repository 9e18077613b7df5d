//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::CaptureProfile;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    profile_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ProfileSummary>,
}

#[derive(Serialize)]
struct ProfileSummary {
    version: String,
    vehicle: String,
    role_name: String,
    sensor_count: usize,
    outputs: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(profile = %args.profile.display(), "Validating profile");

    let result = validate_profile(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Profile validation failed")
    }
}

fn validate_profile(args: &ValidateArgs) -> ValidationResult {
    let profile_path = args.profile.display().to_string();

    // Check file exists
    if !args.profile.exists() {
        return ValidationResult {
            valid: false,
            profile_path,
            error: Some(format!("File not found: {}", args.profile.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.profile) {
        Ok(profile) => {
            let warnings = collect_warnings(&profile);
            ValidationResult {
                valid: true,
                profile_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ProfileSummary {
                    version: format!("{:?}", profile.version),
                    vehicle: profile.vehicle.blueprint.clone(),
                    role_name: profile.vehicle.role_name.clone(),
                    sensor_count: profile.sensors.len(),
                    outputs: profile
                        .sensors
                        .iter()
                        .map(|s| format!("{}/ ({})", s.output.subdir, s.id))
                        .collect(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            profile_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect profile warnings (non-fatal issues)
fn collect_warnings(profile: &CaptureProfile) -> Vec<String> {
    let mut warnings = Vec::new();

    if profile.sensors.is_empty() {
        warnings.push("No sensors configured - nothing will be written".to_string());
    }

    for sensor in profile.sensors.iter().filter(|s| s.kind.is_camera()) {
        let sized = ["image_size_x", "image_size_y"]
            .iter()
            .all(|key| sensor.attributes.contains_key(*key));
        if !sized {
            warnings.push(format!(
                "Camera '{}' has no image_size_x/image_size_y - simulator defaults apply",
                sensor.id
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Profile is valid: {}", result.profile_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Vehicle: {} (role '{}')", summary.vehicle, summary.role_name);
            println!("  Sensors: {}", summary.sensor_count);
            for output in &summary.outputs {
                println!("    - {}", output);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Profile is invalid: {}", result.profile_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
