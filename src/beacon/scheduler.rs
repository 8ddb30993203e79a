// BeaconBench - C2 Beacon Telemetry Generator
// Jittered wake scheduling: irregular intervals defeat naive periodicity
// fingerprinting, which is exactly what beacon-jitter detections look for

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::time::Duration;

/// Swappable randomness source so timing is deterministic under test and
/// reproducible with --seed.
pub trait JitterSource: Send + Sync {
    /// Uniform sample from [lo, hi].
    fn uniform(&mut self, lo: f64, hi: f64) -> f64;
}

pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        thread_rng().gen_range(lo..=hi)
    }
}

pub struct SeededJitter(StdRng);

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        SeededJitter(StdRng::seed_from_u64(seed))
    }
}

impl JitterSource for SeededJitter {
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        self.0.gen_range(lo..=hi)
    }
}

pub struct JitterScheduler {
    base_ms: u64,
    fraction: f64,
    source: Box<dyn JitterSource>,
}

impl JitterScheduler {
    pub fn new(base_ms: u64, fraction: f64, source: Box<dyn JitterSource>) -> Self {
        JitterScheduler {
            base_ms,
            fraction,
            source,
        }
    }

    /// Next wake delay: base +/- uniform jitter, clamped to a non-negative
    /// floor. Always within [base*(1-f), base*(1+f)].
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_ms as f64;
        let spread = base * self.fraction;

        let delay_ms = if spread > 0.0 {
            (base + self.source.uniform(-spread, spread)).max(0.0)
        } else {
            base
        };

        Duration::from_millis(delay_ms.round() as u64)
    }

    /// True while more cycles remain under the configured cap.
    pub fn should_continue(seq: u64, max_count: u32) -> bool {
        seq < max_count as u64
    }
}
