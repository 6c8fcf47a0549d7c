//! Liveness Checks
//!
//! A probe asks a [`LivenessCheck`] whether a worker is alive; the registry
//! then turns the verdict into a [`HealthStatus`](crate::HealthStatus).
//! The stock policy is [`RandomizedCheck`], a coin flip with a configurable
//! success rate. A deployment talking to real workers swaps in its own
//! implementation without touching the registry.

use rand::{Rng, RngCore};

use crate::worker::Worker;

/// Default probability that a randomized probe passes
pub const DEFAULT_PROBE_SUCCESS_RATE: f64 = 0.95;

/// Policy deciding whether a worker passes a health probe
pub trait LivenessCheck: Send {
    /// Return true if the worker should be considered alive
    ///
    /// `rng` is the router's injected random source; deterministic checks
    /// are free to ignore it.
    fn check(&mut self, worker: &Worker, rng: &mut dyn RngCore) -> bool;
}

/// Passes with a fixed probability, independent of the worker
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomizedCheck {
    success_rate: f64,
}

impl RandomizedCheck {
    /// Create a check passing with `success_rate`, clamped to `0.0..=1.0`
    #[must_use]
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_nan() {
            DEFAULT_PROBE_SUCCESS_RATE
        } else {
            success_rate.clamp(0.0, 1.0)
        };
        Self { success_rate }
    }

    /// Configured success probability
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for RandomizedCheck {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_SUCCESS_RATE)
    }
}

impl LivenessCheck for RandomizedCheck {
    fn check(&mut self, _worker: &Worker, rng: &mut dyn RngCore) -> bool {
        rng.gen::<f64>() < self.success_rate
    }
}

impl<F> LivenessCheck for F
where
    F: FnMut(&Worker) -> bool + Send,
{
    fn check(&mut self, worker: &Worker, _rng: &mut dyn RngCore) -> bool {
        self(worker)
    }
}
