//! Wall-clock environment for the running server.
//!
//! Session identifiers are drawn from the OS entropy source so they cannot be
//! predicted by other participants. Time is the monotonic clock; nothing in
//! the room logic depends on calendar time.

use wordpulse_core::env::Environment;

/// [`Environment`] backed by `std::time::Instant` and `getrandom`.
///
/// # Panics
///
/// `random_bytes` panics if the OS entropy source fails. Without it the
/// gateway cannot assign session identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create the environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS entropy source is available");
    }
}
