//! # starmap-cli
//!
//! Configuration and command implementations behind the `starmap` binary.

pub mod commands;
pub mod config;

pub use config::{ConfigError, ConfigResult, StarmapConfig};
