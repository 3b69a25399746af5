// ============================================================
// Layer 6 — Timer
// ============================================================
// Wall-clock stopwatch for one unit of work (a training batch).
// Purely observational: the training loop only reads the
// elapsed time for its progress log.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Run `work` and return its result with the time it took.
    pub fn measure<T>(work: impl FnOnce() -> T) -> (T, Duration) {
        let timer  = Self::start();
        let result = work();
        (result, timer.elapsed())
    }
}
