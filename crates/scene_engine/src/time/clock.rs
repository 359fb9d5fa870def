//! Simulation clock
//!
//! Tracks real time, which always advances, and scaled simulation time, which
//! advances only while the game is running or for a single armed step.
//! Three flags drive the state machine:
//!
//! ```text
//!              start                pause
//!   Stopped ─────────▶ Running ◀──────────▶ Paused ──step──▶ StepPending
//!      ▲                  │        resume      ▲                  │
//!      └──── stop ────────┴────────────────────┘◀── next tick ────┘
//! ```
//!
//! [`GameClock::pre_update`] is called exactly once per frame regardless of
//! state. Time is integrated in whole milliseconds.

use crate::foundation::time::{SystemTimeSource, TimeSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Clock tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Simulation time granted by one step, independent of real time
    pub step_delta_time_ms: u64,
    /// Initial time scale; negative values are floored at zero
    pub time_scale: f32,
    /// Frame rate cap used by [`GameClock::frame_limit_delay`]
    pub max_fps: u32,
    /// Whether to honour `max_fps`
    pub limit_framerate: bool,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            step_delta_time_ms: 16,
            time_scale: 1.0,
            max_fps: 60,
            limit_framerate: true,
        }
    }
}

/// Externally meaningful clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Game not started; simulation time is zero
    Stopped,
    /// Simulation time advances every tick
    Running,
    /// Started but frozen
    Paused,
    /// Paused with one step armed for the next tick
    StepPending,
}

/// Play/pause/step clock with scaled simulation time
pub struct GameClock {
    source: Box<dyn TimeSource>,
    config: TimeConfig,
    time_scale: f32,

    frame_count: u64,
    real_time_last_ms: u64,
    real_time_delta_ms: u64,
    time_last_ms: u64,
    time_delta_ms: u64,

    started: bool,
    running: bool,
    step_pending: bool,
}

impl std::fmt::Debug for GameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameClock")
            .field("state", &self.state())
            .field("frame_count", &self.frame_count)
            .field("real_time_ms", &self.real_time_last_ms)
            .field("time_ms", &self.time_last_ms)
            .field("time_scale", &self.time_scale)
            .finish_non_exhaustive()
    }
}

impl GameClock {
    /// Clock driven by the wall clock
    pub fn new(config: TimeConfig) -> Self {
        Self::with_source(config, Box::new(SystemTimeSource::new()))
    }

    /// Clock driven by an arbitrary real-time source
    pub fn with_source(config: TimeConfig, source: Box<dyn TimeSource>) -> Self {
        let real_time_last_ms = source.now_ms();
        Self {
            source,
            time_scale: sanitize_scale(config.time_scale),
            config,
            frame_count: 0,
            real_time_last_ms,
            real_time_delta_ms: 0,
            time_last_ms: 0,
            time_delta_ms: 0,
            started: false,
            running: false,
            step_pending: false,
        }
    }

    /// Sample the time source and integrate one frame
    pub fn pre_update(&mut self) {
        let now = self.source.now_ms().max(self.real_time_last_ms);
        self.integrate(now - self.real_time_last_ms);
    }

    /// Integrate one frame of `real_delta_ms` real time.
    ///
    /// [`pre_update`](Self::pre_update) calls this with the sampled delta;
    /// drivers that own their own timing may call it directly.
    pub fn integrate(&mut self, real_delta_ms: u64) {
        self.frame_count += 1;
        self.real_time_delta_ms = real_delta_ms;
        self.real_time_last_ms = self.real_time_last_ms.saturating_add(real_delta_ms);

        if self.running {
            // Precision loss is irrelevant at frame-sized deltas.
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scaled = (real_delta_ms as f32 * self.time_scale).round() as u64;
            self.time_delta_ms = scaled;
            self.time_last_ms += scaled;
        } else if self.step_pending {
            self.time_delta_ms = self.config.step_delta_time_ms;
            self.time_last_ms += self.time_delta_ms;
            self.step_pending = false;
        } else {
            self.time_delta_ms = 0;
        }
    }

    /// Stopped → Running
    pub fn start_game(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.running = true;
        log::info!("Game started");
    }

    /// Any started state → Stopped; simulation time resets to zero
    pub fn stop_game(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.running = false;
        self.step_pending = false;
        self.time_last_ms = 0;
        self.time_delta_ms = 0;
        log::info!("Game stopped");
    }

    /// Running → Paused
    pub fn pause_game(&mut self) {
        if !self.started || !self.running {
            return;
        }
        self.running = false;
        log::info!("Game paused at {} ms", self.time_last_ms);
    }

    /// Paused → Running
    pub fn resume_game(&mut self) {
        if !self.started || self.running {
            return;
        }
        self.running = true;
        log::info!("Game resumed");
    }

    /// Arm a single fixed step, starting and pausing first if needed
    pub fn step_game(&mut self) {
        if !self.started {
            self.start_game();
        }
        if self.running {
            self.pause_game();
        }
        self.step_pending = true;
        log::debug!("Step armed ({} ms)", self.config.step_delta_time_ms);
    }

    /// Current state
    pub fn state(&self) -> ClockState {
        match (self.started, self.running, self.step_pending) {
            (false, _, _) => ClockState::Stopped,
            (true, true, _) => ClockState::Running,
            (true, false, true) => ClockState::StepPending,
            (true, false, false) => ClockState::Paused,
        }
    }

    /// Whether the game has been started and not stopped
    pub fn has_game_started(&self) -> bool {
        self.started
    }

    /// Whether simulation time advances every tick
    pub fn is_game_running(&self) -> bool {
        self.running
    }

    /// Whether a step is armed for the next tick
    pub fn is_step_pending(&self) -> bool {
        self.step_pending
    }

    /// Current time scale
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Set the time scale; negative or NaN values are floored at zero
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = sanitize_scale(time_scale);
    }

    /// Simulation time granted by a step
    pub fn step_delta_time_ms(&self) -> u64 {
        self.config.step_delta_time_ms
    }

    /// Change the step size
    pub fn set_step_delta_time_ms(&mut self, step_ms: u64) {
        self.config.step_delta_time_ms = step_ms;
    }

    /// Frames integrated so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Simulation delta of the last frame in milliseconds
    pub fn delta_time_ms(&self) -> u64 {
        self.time_delta_ms
    }

    /// Simulation time in milliseconds
    pub fn time_ms(&self) -> u64 {
        self.time_last_ms
    }

    /// Real delta of the last frame in milliseconds
    pub fn real_time_delta_ms(&self) -> u64 {
        self.real_time_delta_ms
    }

    /// Real time since the clock was created in milliseconds
    pub fn real_time_ms(&self) -> u64 {
        self.real_time_last_ms
    }

    /// Simulation delta of the last frame in seconds
    #[allow(clippy::cast_precision_loss)]
    pub fn delta_time(&self) -> f32 {
        self.time_delta_ms as f32 / 1000.0
    }

    /// Real delta of the last frame in seconds
    #[allow(clippy::cast_precision_loss)]
    pub fn real_time_delta_time(&self) -> f32 {
        self.real_time_delta_ms as f32 / 1000.0
    }

    /// Simulation time in seconds
    #[allow(clippy::cast_precision_loss)]
    pub fn time_since_startup(&self) -> f32 {
        self.time_last_ms as f32 / 1000.0
    }

    /// Real time in seconds
    #[allow(clippy::cast_precision_loss)]
    pub fn real_time_since_startup(&self) -> f32 {
        self.real_time_last_ms as f32 / 1000.0
    }

    /// How long to wait before the next frame to honour `max_fps`.
    ///
    /// Measured from the last [`pre_update`](Self::pre_update) sample.
    pub fn frame_limit_delay(&self) -> Option<Duration> {
        if !self.config.limit_framerate || self.config.max_fps == 0 {
            return None;
        }
        let min_frame_ms = 1000 / u64::from(self.config.max_fps);
        let frame_ms = self.source.now_ms().saturating_sub(self.real_time_last_ms);
        (frame_ms < min_frame_ms).then(|| Duration::from_millis(min_frame_ms - frame_ms))
    }

    /// Clock configuration
    pub fn config(&self) -> &TimeConfig {
        &self.config
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(TimeConfig::default())
    }
}

fn sanitize_scale(time_scale: f32) -> f32 {
    if time_scale.is_nan() {
        0.0
    } else {
        time_scale.max(0.0)
    }
}
