//! # Ego Capture CLI
//!
//! Library half of the `ego-capture` binary: argument definitions, command
//! implementations and the capture session orchestrator.

pub mod cli;
pub mod commands;
pub mod session;
