//! Core runtime module
//!
//! Contains the runtime configuration

mod config;

pub use config::{Config, ConfigError};
