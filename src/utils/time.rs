#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Monotonic stopwatch with microsecond resolution.
///
/// Used to measure per-frame synchronization cost. Readings never go
/// negative: a clock that appears to run backwards reports zero.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start_time: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates a timer starting from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Restarts the measurement from now.
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
    }

    #[must_use]
    pub fn microseconds(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.start_time);
        u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn milliseconds(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.start_time);
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }

    /// Elapsed seconds, derived from microseconds when `high_precision` is set
    /// and from milliseconds otherwise.
    #[must_use]
    pub fn seconds(&self, high_precision: bool) -> f32 {
        if high_precision {
            self.microseconds() as f32 / 1_000_000.0
        } else {
            self.milliseconds() as f32 / 1_000.0
        }
    }
}
