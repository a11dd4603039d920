//! Core types for the citrine emulator front-end
//!
//! This crate provides the error taxonomy, configuration, and logging
//! infrastructure shared by the session controller and the host binary.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{ConfigError, EngineError, SessionError};
