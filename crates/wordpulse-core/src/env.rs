//! Environment abstraction for deterministic testing.
//!
//! Decouples room logic from system resources (time, randomness). Production
//! uses the wall clock and OS entropy; the simulation harness uses a virtual
//! clock and a seeded RNG so every run is reproducible.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated environment produces the same sequence
///   of random bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`; simulation uses a virtual clock
    /// built on the same type.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for connection session IDs.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
