//! Fixed-rate tick loop.
//!
//! The session advances in fixed steps regardless of how long a wall-clock
//! frame took, using the accumulator pattern. Slow frames are clamped so a
//! stall never triggers a burst of catch-up ticks.

use std::time::Instant;
use tracing::warn;

/// Default tick rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Longest wall-clock frame accounted for, in seconds.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Accumulator-based fixed-rate loop.
pub struct TickLoop {
    dt: f64,
    previous_time: Instant,
    accumulator: f64,
    total_time: f64,
    tick_count: u64,
}

impl TickLoop {
    /// Creates a loop ticking `rate` times per second. A zero rate falls
    /// back to [`DEFAULT_TICK_RATE`].
    pub fn new(rate: u32) -> Self {
        let rate = if rate == 0 { DEFAULT_TICK_RATE } else { rate };
        Self {
            dt: 1.0 / f64::from(rate),
            previous_time: Instant::now(),
            accumulator: 0.0,
            total_time: 0.0,
            tick_count: 0,
        }
    }

    /// Fixed step in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Measures the wall-clock time since the last call and runs the fixed
    /// steps it covers. `step(dt, total_time)` returns `false` to stop early.
    /// Returns the number of steps run.
    pub fn tick(&mut self, step: impl FnMut(f64, f64) -> bool) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time, step)
    }

    /// Runs the fixed steps covered by `frame_time` seconds.
    pub fn advance(&mut self, frame_time: f64, mut step: impl FnMut(f64, f64) -> bool) -> u32 {
        let frame_time = if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            frame_time.max(0.0)
        };
        self.accumulator += frame_time;

        let mut steps = 0;
        while self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            let keep_going = step(self.dt, self.total_time);
            self.total_time += self.dt;
            self.tick_count += 1;
            steps += 1;
            if !keep_going {
                self.accumulator = 0.0;
                break;
            }
        }
        steps
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    pub fn alpha(&self) -> f64 {
        self.accumulator / self.dt
    }

    /// Total fixed steps run.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulated time in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}
