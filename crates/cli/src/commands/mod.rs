//! Command implementations.

mod profile;
mod run;
mod validate;

pub use profile::run_profile;
pub use run::{run_capture, shutdown_signal};
pub use validate::run_validate;
