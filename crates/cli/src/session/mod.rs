//! Capture session orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{CaptureSession, SessionConfig};
pub use stats::{ExitReason, SessionStats};
