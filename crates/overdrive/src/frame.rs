//! Frame-time smoothing.

use std::time::Instant;

// Weight of the newest sample in the moving average.
const ALPHA: f64 = 0.10;

/// Exponentially weighted moving average over observed frame times.
///
/// A single slow frame (cell load, autosave) must not trigger a budget
/// cut; the average has to stay elevated across many samples before the
/// scaling policy reacts.
#[derive(Debug)]
pub struct FrameClock {
    ema_ms: f64,
    last: Option<Instant>,
}

impl FrameClock {
    /// Creates a clock seeded at `initial_ms`, usually the frame-time
    /// target, so the first adjustments start from a neutral reading.
    #[must_use]
    pub fn new(initial_ms: f64) -> Self {
        Self {
            ema_ms: initial_ms,
            last: None,
        }
    }

    /// Records the time elapsed since the previous call and returns the
    /// updated average. The first call only arms the clock.
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            let dt_ms = now.duration_since(last).as_secs_f64() * 1000.0;
            self.observe(dt_ms);
        }
        self.ema_ms
    }

    /// Feeds one frame-time sample in milliseconds.
    pub fn observe(&mut self, dt_ms: f64) {
        self.ema_ms = (1.0 - ALPHA) * self.ema_ms + ALPHA * dt_ms;
    }

    /// The current smoothed frame time in milliseconds.
    #[must_use]
    pub fn ema_ms(&self) -> f64 {
        self.ema_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_spike_barely_moves_the_average() {
        let mut clock = FrameClock::new(16.0);
        clock.observe(100.0);
        assert!((clock.ema_ms() - 24.4).abs() < 1e-9);
    }

    #[test]
    fn sustained_load_converges_on_the_sample() {
        let mut clock = FrameClock::new(16.0);
        for _ in 0..200 {
            clock.observe(33.0);
        }
        assert!((clock.ema_ms() - 33.0).abs() < 0.01);
    }

    #[test]
    fn steady_input_is_a_fixed_point() {
        let mut clock = FrameClock::new(16.67);
        clock.observe(16.67);
        assert!((clock.ema_ms() - 16.67).abs() < 1e-9);
    }

    #[test]
    fn first_tick_only_arms_the_clock() {
        let mut clock = FrameClock::new(16.0);
        assert!((clock.tick() - 16.0).abs() < 1e-9);
    }
}
