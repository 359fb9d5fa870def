//! Editor-side hooks driven by [`Engine::run`]

use crate::config::ConfigError;
use crate::engine::{Engine, EngineError};
use crate::scene::SceneError;
use thiserror::Error;

/// Code that owns a scene session.
///
/// Implement this trait to drive a scene with [`Engine::run`].
pub trait Application {
    /// Build or load the initial scene; called once before the first frame
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Per-frame hook, called after the clock and the scene have advanced.
    ///
    /// `delta_time` is the real time since the previous frame in seconds,
    /// unaffected by pause or time scale.
    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError>;

    /// Called when the loop ends, including after a failed update
    fn cleanup(&mut self, engine: &mut Engine);
}

/// Errors raised by [`Application`] hooks
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine failure surfaced to the application
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Scene edit rejected
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Configuration could not be read or was invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Anything else, described by the application
    #[error("Application error: {0}")]
    Custom(String),
}
