//! FrameSink trait - per-frame output interface

use std::path::PathBuf;

use crate::{ContractError, SensorPacket};

/// Frame output trait
///
/// Called directly from sensor callbacks, so implementations take `&self`
/// and must tolerate concurrent calls for different sensors.
pub trait FrameSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one sensor frame
    ///
    /// Returns the path that was written.
    ///
    /// # Errors
    /// Returns a write error carrying sensor and frame context
    fn write(&self, packet: &SensorPacket) -> Result<PathBuf, ContractError>;
}
