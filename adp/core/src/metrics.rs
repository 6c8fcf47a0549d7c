#![allow(missing_docs)]
//! Router Metrics
//!
//! Counters for the routing system:
//! - Decisions made, split by strategy
//! - Requests that found no eligible worker
//! - Validators assigned
//! - Health probes and probe failures
//! - Capacity releases (and releases that had nothing to release)
//!
//! Counters are atomics so a status surface can read them through an `Arc`
//! without taking the routing lock.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::request::SelectionStrategy;

// ============================================================================
// Counter
// ============================================================================

/// A simple atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Router Metrics
// ============================================================================

/// Counters shared between the engine, the registry and observers
#[derive(Debug, Default)]
pub struct RouterMetrics {
    pub decisions: Counter,
    pub weighted_decisions: Counter,
    pub round_robin_weighted_decisions: Counter,
    pub round_robin_decisions: Counter,
    pub no_available_workers: Counter,
    pub validators_assigned: Counter,
    pub probes: Counter,
    pub probe_failures: Counter,
    pub releases: Counter,
    pub ignored_releases: Counter,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one routing decision
    pub fn record_decision(&self, strategy: SelectionStrategy, validators: usize) {
        self.decisions.inc();
        match strategy {
            SelectionStrategy::Weighted => self.weighted_decisions.inc(),
            SelectionStrategy::RoundRobinWeighted => self.round_robin_weighted_decisions.inc(),
            SelectionStrategy::RoundRobin => self.round_robin_decisions.inc(),
            SelectionStrategy::NoAvailableWorkers => self.no_available_workers.inc(),
        }
        self.validators_assigned.add(validators as u64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            decisions: self.decisions.get(),
            weighted_decisions: self.weighted_decisions.get(),
            round_robin_weighted_decisions: self.round_robin_weighted_decisions.get(),
            round_robin_decisions: self.round_robin_decisions.get(),
            no_available_workers: self.no_available_workers.get(),
            validators_assigned: self.validators_assigned.get(),
            probes: self.probes.get(),
            probe_failures: self.probe_failures.get(),
            releases: self.releases.get(),
            ignored_releases: self.ignored_releases.get(),
        }
    }
}

/// Point-in-time copy of [`RouterMetrics`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub decisions: u64,
    pub weighted_decisions: u64,
    pub round_robin_weighted_decisions: u64,
    pub round_robin_decisions: u64,
    pub no_available_workers: u64,
    pub validators_assigned: u64,
    pub probes: u64,
    pub probe_failures: u64,
    pub releases: u64,
    pub ignored_releases: u64,
}

impl MetricsSnapshot {
    /// Fraction of probes that failed (0.0 when nothing was probed)
    pub fn probe_failure_rate(&self) -> f64 {
        if self.probes == 0 {
            0.0
        } else {
            self.probe_failures as f64 / self.probes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_record_decision_by_strategy() {
        let metrics = RouterMetrics::new();
        metrics.record_decision(SelectionStrategy::Weighted, 2);
        metrics.record_decision(SelectionStrategy::RoundRobin, 0);
        metrics.record_decision(SelectionStrategy::NoAvailableWorkers, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions, 3);
        assert_eq!(snapshot.weighted_decisions, 1);
        assert_eq!(snapshot.round_robin_decisions, 1);
        assert_eq!(snapshot.round_robin_weighted_decisions, 0);
        assert_eq!(snapshot.no_available_workers, 1);
        assert_eq!(snapshot.validators_assigned, 2);
    }

    #[test]
    fn test_probe_failure_rate() {
        let mut snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.probe_failure_rate(), 0.0);

        snapshot.probes = 20;
        snapshot.probe_failures = 1;
        assert!((snapshot.probe_failure_rate() - 0.05).abs() < 1e-12);
    }
}
