//! Layered error definitions
//!
//! Categorized by source: config / sink / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Profile parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Profile validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Frame could not be persisted
    #[error("sink '{sink_name}' failed to write frame {frame} of '{sensor_id}': {message}")]
    FrameWrite {
        sink_name: String,
        sensor_id: String,
        frame: u64,
        message: String,
    },

    /// Sensor has no output route
    #[error("sink '{sink_name}' has no route for sensor '{sensor_id}'")]
    UnroutedSensor {
        sink_name: String,
        sensor_id: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create frame write error
    pub fn frame_write(
        sink_name: impl Into<String>,
        sensor_id: impl Into<String>,
        frame: u64,
        message: impl Into<String>,
    ) -> Self {
        Self::FrameWrite {
            sink_name: sink_name.into(),
            sensor_id: sensor_id.into(),
            frame,
            message: message.into(),
        }
    }
}
