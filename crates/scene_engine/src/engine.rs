//! Core engine implementation
//!
//! The engine owns the scene and the simulation clock and advances both once
//! per frame. Quit requests are honoured only at the top of a frame, so a
//! traversal that has started always completes.

use crate::{
    application::Application,
    config::{Config, ConfigError},
    core::config::EngineConfig,
    foundation::time::TimeSource,
    scene::{Scene, SceneError},
    time::{ClockState, GameClock},
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a single [`Engine::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame ran; keep going
    Continue,
    /// Quit was requested; nothing ran
    Quit,
}

/// Shared quit flag.
///
/// Clones refer to the same flag, so any thread or callback holding one can
/// stop the frame loop.
#[derive(Debug, Clone, Default)]
pub struct QuitHandle(Arc<AtomicBool>);

impl QuitHandle {
    /// Ask the engine to stop before its next frame
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a quit has been requested
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Main engine struct
///
/// The engine coordinates the scene and the clock and runs the main loop.
pub struct Engine {
    /// Scene tree, lookup table and spatial index
    pub scene: Scene,

    /// Simulation clock
    pub clock: GameClock,

    /// Engine configuration
    config: EngineConfig,

    /// Set to leave the frame loop
    quit: QuitHandle,
}

impl Engine {
    /// Create a new engine instance driven by the wall clock
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let clock = GameClock::new(config.time);
        Self::with_clock(config, clock)
    }

    /// Create an engine whose clock reads `source`
    pub fn with_time_source(config: EngineConfig, source: Box<dyn TimeSource>) -> Result<Self, EngineError> {
        let clock = GameClock::with_source(config.time, source);
        Self::with_clock(config, clock)
    }

    fn with_clock(config: EngineConfig, clock: GameClock) -> Result<Self, EngineError> {
        log::info!("Initializing engine...");
        let scene = Scene::new(config.scene.clone())?;
        Ok(Self {
            scene,
            clock,
            config,
            quit: QuitHandle::default(),
        })
    }

    /// Load a `.toml` or `.ron` configuration file and create an engine from it
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::new(EngineConfig::load_from_file(path)?)
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle that stops the loop from elsewhere
    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    /// Request engine shutdown
    pub fn quit(&self) {
        log::info!("Engine shutdown requested");
        self.quit.request();
    }

    /// Advance one frame: integrate the clock, then update the scene
    pub fn tick(&mut self) -> FrameStatus {
        if self.quit.is_requested() {
            return FrameStatus::Quit;
        }
        self.clock.pre_update();
        self.scene.update(self.clock.delta_time());
        FrameStatus::Continue
    }

    /// Run the engine main loop with the given application
    pub fn run<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::Application(format!("App initialization: {e}")))?;

        log::info!("Starting main loop...");

        while self.tick() == FrameStatus::Continue {
            let delta_time = self.clock.real_time_delta_time();
            if let Err(e) = app.update(self, delta_time) {
                app.cleanup(self);
                return Err(EngineError::Application(format!("App update: {e}")));
            }

            if let Some(delay) = self.clock.frame_limit_delay() {
                std::thread::sleep(delay);
            }
        }

        app.cleanup(self);

        log::info!("Engine shutdown complete");
        Ok(())
    }

    /// Start the game and fire `on_play` across the scene
    pub fn start_game(&mut self) {
        if self.clock.state() == ClockState::Stopped {
            self.clock.start_game();
            self.scene.notify_play();
        }
    }

    /// Stop the game, rewinding simulation time, and fire `on_stop`
    pub fn stop_game(&mut self) {
        if self.clock.state() != ClockState::Stopped {
            self.clock.stop_game();
            self.scene.notify_stop();
        }
    }

    /// Pause a running game
    pub fn pause_game(&mut self) {
        self.clock.pause_game();
    }

    /// Resume a paused game
    pub fn resume_game(&mut self) {
        self.clock.resume_game();
    }

    /// Advance by one fixed step on the next frame, starting the game first
    /// if it is stopped
    pub fn step_game(&mut self) {
        self.start_game();
        self.clock.step_game();
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene construction or editing failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Application error
    #[error("Application error: {0}")]
    Application(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
