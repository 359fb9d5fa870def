//! # Core Engine Module
//!
//! Shared configuration used by the scene, the clock and the frame driver.

pub mod config;

pub use config::{Config, ConfigError, ConfigFormat, EngineConfig, SceneConfig};
