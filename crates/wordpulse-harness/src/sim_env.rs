//! Simulated environment: virtual clock and seeded RNG.
//!
//! Time only moves when a test calls [`SimEnv::advance`], and the random
//! stream is a ChaCha generator seeded at construction, so two runs with the
//! same seed and the same operations are identical.

use std::{
    ops::Sub,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wordpulse_core::env::Environment;

/// Point on the virtual clock, measured from simulation start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since simulation start.
    pub fn elapsed_since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

/// Deterministic environment for simulation.
///
/// Clones share the clock and RNG.
#[derive(Debug, Clone)]
pub struct SimEnv {
    seed: u64,
    clock: Arc<Mutex<SimInstant>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            clock: Arc::new(Mutex::new(SimInstant::default())),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Seed this environment was built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut clock = self.clock.lock().unwrap_or_else(PoisonError::into_inner);
        *clock = SimInstant(clock.0 + duration);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        *self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
