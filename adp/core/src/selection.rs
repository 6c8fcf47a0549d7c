//! Selection Algorithms
//!
//! Two ways of choosing one worker out of an eligible set:
//!
//! - **Weighted**: roulette-wheel draw over a per-worker score that rewards
//!   weight, speed and accuracy and penalizes load and degraded health.
//! - **Round-robin**: a per-category cursor walking the candidate list in
//!   order, wrapping when the list shrinks underneath it.
//!
//! # Scoring
//!
//! ```text
//! score = base_weight
//!       × min(1.0, 1000 / avg_latency_ms)
//!       × accuracy
//!       × max(0.1, 1 − current_load / max_concurrent)
//!       × (0.5 if Degraded else 1.0)
//! ```

use rand::{Rng, RngCore};

use crate::worker::{HealthStatus, Worker};

/// Latency at or below which a worker earns the full speed factor
const FULL_SPEED_LATENCY_MS: f64 = 1000.0;

/// Smallest load factor a saturated worker can fall to
const MIN_LOAD_FACTOR: f64 = 0.1;

/// Multiplier applied to degraded workers
const DEGRADED_FACTOR: f64 = 0.5;

/// Selection score of a worker; higher is more likely to be picked
#[must_use]
pub fn selection_score(worker: &Worker) -> f64 {
    let speed = (FULL_SPEED_LATENCY_MS / worker.avg_latency_ms).min(1.0);
    let utilization = f64::from(worker.current_load) / f64::from(worker.max_concurrent().max(1));
    let load = (1.0 - utilization).max(MIN_LOAD_FACTOR);
    let health = if worker.status == HealthStatus::Degraded {
        DEGRADED_FACTOR
    } else {
        1.0
    };

    worker.profile.weight * speed * worker.accuracy * load * health
}

/// Roulette-wheel draw over precomputed scores
///
/// Returns the index of the first entry whose running total meets or
/// exceeds a uniform draw in `[0, total)`. A non-positive total falls back
/// to a uniform pick; rounding that leaves no crossing yields the last
/// index. `None` only for an empty slice.
pub fn weighted_index(scores: &[f64], rng: &mut dyn RngCore) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }

    let total: f64 = scores.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Some(rng.gen_range(0..scores.len()));
    }

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (index, score) in scores.iter().enumerate() {
        cumulative += score;
        if cumulative >= draw {
            return Some(index);
        }
    }

    Some(scores.len() - 1)
}

/// Weighted pick among candidate workers
///
/// Ties resolve to the earliest candidate in input order.
pub fn weighted_pick<'a>(candidates: &[&'a Worker], rng: &mut dyn RngCore) -> Option<&'a Worker> {
    let scores: Vec<f64> = candidates.iter().map(|w| selection_score(w)).collect();
    weighted_index(&scores, rng).map(|index| candidates[index])
}

/// Round-robin pick driven by an external cursor
///
/// A cursor past the end (the list shrank) wraps to 0. The cursor is left
/// pointing at the following candidate.
pub fn round_robin_pick<'a, T>(candidates: &'a [T], cursor: &mut usize) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    if *cursor >= candidates.len() {
        *cursor = 0;
    }
    let picked = &candidates[*cursor];
    *cursor = (*cursor + 1) % candidates.len();
    Some(picked)
}
