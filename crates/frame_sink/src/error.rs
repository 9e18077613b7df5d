//! Frame sink error types

use std::path::PathBuf;

use contracts::FileFormat;
use thiserror::Error;

/// Frame sink specific errors
#[derive(Debug, Error)]
pub enum FrameSinkError {
    /// Filesystem failure
    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image encoder failure
    #[error("failed to encode '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Pixel buffer does not match the declared dimensions
    #[error("image {width}x{height} expects {expected} bytes, got {actual}")]
    InvalidImage {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// Payload cannot be stored in the routed format
    #[error("sensor '{sensor_id}' delivered a payload that cannot be stored as {format:?}")]
    PayloadMismatch { sensor_id: String, format: FileFormat },

    /// No route configured for this sensor
    #[error("no output route for sensor '{sensor_id}'")]
    Unrouted { sensor_id: String },
}

impl FrameSinkError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
