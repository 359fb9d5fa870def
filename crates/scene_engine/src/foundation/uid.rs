//! Process-unique 64-bit identifiers
//!
//! Identifiers are drawn from a 64-bit random generator, so uniqueness is
//! probabilistic rather than guaranteed. The value 0 is never produced; it
//! marks "no entity" in persisted scenes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of an entity or resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(u64);

impl Uid {
    /// Reserved "no entity" value used in persisted data
    pub const NONE: Uid = Uid(0);

    /// Wrap a raw identifier
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the reserved "no entity" value
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Random UID source owned by a scene
#[derive(Debug, Clone)]
pub struct UidGenerator {
    rng: StdRng,
}

impl UidGenerator {
    /// Create a generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible generator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next identifier
    pub fn generate(&mut self) -> Uid {
        loop {
            let raw: u64 = self.rng.gen();
            if raw != 0 {
                return Uid(raw);
            }
        }
    }
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an identifier from the thread-local generator
pub fn generate_uid() -> Uid {
    let mut rng = rand::thread_rng();
    loop {
        let raw: u64 = rng.gen();
        if raw != 0 {
            return Uid(raw);
        }
    }
}
