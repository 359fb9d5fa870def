//! Simulation time
//!
//! The [`GameClock`] separates real time from the scaled simulation time that
//! components consume, and owns the editor's play/pause/step state machine.

mod clock;

pub use clock::{ClockState, GameClock, TimeConfig};
