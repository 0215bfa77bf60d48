//! Failure sources deciding when the simulated gateway fails.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU32, Ordering};

/// Decides, per call, whether the gateway signals a transient failure.
pub trait FailureSource: Send + Sync {
    /// Returns true if the current call should fail.
    fn should_fail(&self) -> bool;
}

impl<F> FailureSource for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn should_fail(&self) -> bool {
        self()
    }
}

/// Fails each call independently with a fixed probability.
#[derive(Debug)]
pub struct RandomFailure {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RandomFailure {
    /// Creates a source seeded from OS entropy.
    ///
    /// `probability` is clamped to `[0, 1]`; NaN is treated as 0.
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self::with_rng(probability, StdRng::from_entropy())
    }

    /// Creates a deterministic source.
    #[must_use]
    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self::with_rng(probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(probability: f64, rng: StdRng) -> Self {
        Self {
            probability: if probability.is_nan() {
                0.0
            } else {
                probability.clamp(0.0, 1.0)
            },
            rng: Mutex::new(rng),
        }
    }

    /// Returns the failure probability.
    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl FailureSource for RandomFailure {
    fn should_fail(&self) -> bool {
        self.rng.lock().gen_bool(self.probability)
    }
}

/// Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFail;

impl FailureSource for NeverFail {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl FailureSource for AlwaysFail {
    fn should_fail(&self) -> bool {
        true
    }
}

/// Fails the first `n` calls, then succeeds forever.
#[derive(Debug)]
pub struct FailFirst {
    remaining: AtomicU32,
}

impl FailFirst {
    /// Creates a source that fails the first `n` calls.
    #[must_use]
    pub fn new(n: u32) -> Self {
        Self {
            remaining: AtomicU32::new(n),
        }
    }
}

impl FailureSource for FailFirst {
    fn should_fail(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sources() {
        assert!(!NeverFail.should_fail());
        assert!(AlwaysFail.should_fail());
    }

    #[test]
    fn test_fail_first() {
        let source = FailFirst::new(2);
        assert!(source.should_fail());
        assert!(source.should_fail());
        assert!(!source.should_fail());
        assert!(!source.should_fail());
    }

    #[test]
    fn test_closure_source() {
        let source = || true;
        assert!(source.should_fail());
    }

    #[test]
    fn test_random_extremes() {
        let never = RandomFailure::new(0.0);
        let always = RandomFailure::new(1.0);
        for _ in 0..100 {
            assert!(!never.should_fail());
            assert!(always.should_fail());
        }
    }

    #[test]
    fn test_random_probability_is_clamped() {
        assert!((RandomFailure::new(7.0).probability() - 1.0).abs() < f64::EPSILON);
        assert!(RandomFailure::new(-1.0).probability().abs() < f64::EPSILON);
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let a = RandomFailure::seeded(0.5, 42);
        let b = RandomFailure::seeded(0.5, 42);
        let run_a: Vec<bool> = (0..64).map(|_| a.should_fail()).collect();
        let run_b: Vec<bool> = (0..64).map(|_| b.should_fail()).collect();
        assert_eq!(run_a, run_b);
    }
}
