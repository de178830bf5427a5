//! Exponential backoff with proportional jitter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wait-time policy between retry attempts.
///
/// `duration(n)` is `base * factor^n`, capped at `max`, then scaled by a
/// uniform factor in `[1 - jitter, 1 + jitter]`. The cap is applied before
/// jitter, so a jittered wait can land slightly above `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    rng: JitterRng,
}

impl Backoff {
    /// No jitter; the pseudo-random source is only created if jitter is enabled later.
    pub fn new(base: Duration, max: Duration, factor: f64) -> Self {
        Self {
            base,
            max,
            factor,
            jitter: 0.0,
            rng: JitterRng::default(),
        }
    }

    /// Jitter ratio in `[0, 1]`; e.g. 0.2 means +/-20%. Values outside the
    /// range are clamped to it; NaN disables jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_nan() {
            0.0
        } else {
            jitter.clamp(0.0, 1.0)
        };
        self
    }

    /// Fix the jitter source so the sequence of durations is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = JitterRng::seeded(seed);
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Wait before retrying after attempt `attempt` (0-based). Negative values count as 0.
    pub fn duration(&self, attempt: i32) -> Duration {
        let attempt = attempt.max(0);
        let raw = self.base.as_nanos() as f64 * self.factor.powi(attempt);
        let mut nanos = raw.min(self.max.as_nanos() as f64);
        if self.jitter > 0.0 {
            nanos *= 1.0 + self.rng.sample(self.jitter);
        }
        if nanos.is_nan() || nanos <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(nanos.min(u64::MAX as f64) as u64)
    }

    /// Waits for attempts `0..attempts`, in order.
    pub fn schedule(&self, attempts: u32) -> Vec<Duration> {
        (0..attempts)
            .map(|a| self.duration(i32::try_from(a).unwrap_or(i32::MAX)))
            .collect()
    }
}

/// Shared, lazily seeded source for jitter draws. Clones share one generator.
#[derive(Debug, Clone, Default)]
struct JitterRng(Arc<OnceLock<Mutex<StdRng>>>);

impl JitterRng {
    fn seeded(seed: u64) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Mutex::new(StdRng::seed_from_u64(seed)));
        Self(Arc::new(cell))
    }

    /// Uniform draw in `[-ratio, +ratio]`.
    fn sample(&self, ratio: f64) -> f64 {
        let rng = self
            .0
            .get_or_init(|| Mutex::new(StdRng::seed_from_u64(time_seed())));
        let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(-ratio..=ratio)
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
