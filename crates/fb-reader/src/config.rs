//! Configuration for the reader state machine.

/// Lowest accepted attempt budget.
const MIN_ATTEMPTS: u32 = 1;
/// Highest accepted attempt budget.
const MAX_ATTEMPTS: u32 = 5;

/// Tunables for comprehension gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Submissions allowed per segment before the gate locks (1-5).
    pub max_attempts: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl ReaderConfig {
    /// Set the attempt budget (clamped to 1-5).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.clamp(MIN_ATTEMPTS, MAX_ATTEMPTS);
        self
    }
}
