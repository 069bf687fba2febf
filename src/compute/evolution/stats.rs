//! Throughput reporting for long runs.

use std::time::{Duration, Instant};

/// Counts evaluations between reports and logs a one-line summary.
#[derive(Debug)]
pub struct RunStats {
    start: Instant,
    prev: Instant,
    evaluated: u64,
}

/// Figures for one reporting window.
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    /// Time since the run started.
    pub elapsed: Duration,
    /// Evaluations per second since the previous report.
    pub per_second: f64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            prev: now,
            evaluated: 0,
        }
    }

    /// Record `count` more evaluated candidates.
    pub fn increment(&mut self, count: usize) {
        self.evaluated += count as u64;
    }

    /// Close the current window and start a new one.
    pub fn window(&mut self) -> Throughput {
        let now = Instant::now();
        let secs = now.duration_since(self.prev).as_secs_f64();
        let per_second = if secs > 0.0 {
            self.evaluated as f64 / secs
        } else {
            0.0
        };

        self.prev = now;
        self.evaluated = 0;

        Throughput {
            elapsed: now.duration_since(self.start),
            per_second,
        }
    }

    /// Log elapsed time, counters, rate and the population's fitness range.
    pub fn report(&mut self, generation: u64, since_change: u64, best: u64, worst: u64) {
        let t = self.window();
        log::info!(
            "elapsed: {:.1?}, gen: {}, since change: {}, candidates/sec: {:.2}, best: {}, worst: {}",
            t.elapsed,
            generation,
            since_change,
            t.per_second,
            best,
            worst
        );
    }
}
