//! # Contracts
//!
//! Shared interface contracts for the ego capture tool.
//! Every other crate depends on this one; it depends on none of them.
//!
//! ## Frame Model
//! - `frame` is the simulator frame number attached to each sensor sample
//! - `timestamp` is simulation time in seconds, kept for diagnostics only

mod error;
mod profile;
mod runtime;
mod sensor;
mod sensor_source;
mod sink;

pub use error::*;
pub use profile::*;
pub use runtime::*;
pub use sensor::*;
pub use sensor_source::{SensorDataCallback, SensorSource};
pub use sink::FrameSink;
