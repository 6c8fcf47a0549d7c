//! Worker Registry & Health Tracker
//!
//! Holds every known worker, the per-category pools used for candidate
//! filtering, and each pool's round-robin cursor.
//!
//! # Lazy Health Refresh
//!
//! There is no background probe timer. When [`WorkerRegistry::eligible`] is
//! asked for a category it re-probes any worker whose last probe is older
//! than the staleness interval, then filters on the resulting status. An
//! entry is therefore never staler than the interval plus the gap between
//! routing calls.
//!
//! ```text
//! eligible(category)
//!   for id in pool (insertion order)
//!     stale? ──yes──> probe(id) ──> Healthy | Degraded | Unavailable
//!       │
//!       no
//!       v
//!     status is Healthy/Degraded? ──> candidate
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use crate::clock::{Clock, SystemClock};
use crate::error::RouterError;
use crate::metrics::RouterMetrics;
use crate::probe::{LivenessCheck, RandomizedCheck};
use crate::selection::round_robin_pick;
use crate::worker::{HealthStatus, Worker, WorkerCategory, WorkerProfile};

/// Default age after which a health entry is re-probed
pub const DEFAULT_STALENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Ordered worker ids for one category plus its round-robin cursor
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryPool {
    members: Vec<String>,
    cursor: usize,
}

impl CategoryPool {
    /// Worker ids in insertion order
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Position the next round-robin pick starts from
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn insert(&mut self, id: &str) -> bool {
        if self.members.iter().any(|m| m == id) {
            return false;
        }
        self.members.push(id.to_string());
        true
    }

    fn remove(&mut self, id: &str) {
        self.members.retain(|m| m != id);
    }
}

/// Registry of workers and their health
pub struct WorkerRegistry {
    workers: HashMap<String, Worker>,
    pools: HashMap<WorkerCategory, CategoryPool>,
    clock: Arc<dyn Clock>,
    liveness: Box<dyn LivenessCheck>,
    staleness_interval: Duration,
    metrics: Arc<RouterMetrics>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.workers.len())
            .field("pools", &self.pools)
            .field("staleness_interval", &self.staleness_interval)
            .finish_non_exhaustive()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Box::new(RandomizedCheck::default()),
            DEFAULT_STALENESS_INTERVAL,
            Arc::new(RouterMetrics::new()),
        )
    }
}

impl WorkerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        liveness: Box<dyn LivenessCheck>,
        staleness_interval: Duration,
        metrics: Arc<RouterMetrics>,
    ) -> Self {
        Self {
            workers: HashMap::new(),
            pools: HashMap::new(),
            clock,
            liveness,
            staleness_interval,
            metrics,
        }
    }

    /// Configured staleness interval
    #[must_use]
    pub fn staleness_interval(&self) -> Duration {
        self.staleness_interval
    }

    /// Insert or overwrite a worker
    ///
    /// The id is appended to its category pool unless already present. A
    /// pool's cursor starts at 0 when the pool is created and is left alone
    /// afterwards. Re-registering an id under another category moves it.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidProfile`] if the profile fails
    /// validation; the registry is left unchanged.
    pub fn register(&mut self, profile: WorkerProfile) -> Result<(), RouterError> {
        profile.validate()?;

        let id = profile.id.clone();
        let category = profile.category;
        let worker = Worker::new(profile, self.clock.now());

        if let Some(previous) = self.workers.insert(id.clone(), worker) {
            if previous.category() != category {
                if let Some(pool) = self.pools.get_mut(&previous.category()) {
                    pool.remove(&id);
                }
            }
            tracing::debug!(worker = %id, category = %category, "Worker profile replaced");
        }

        let pool = self.pools.entry(category).or_default();
        if pool.insert(&id) {
            tracing::info!(
                worker = %id,
                category = %category,
                pool_size = pool.members.len(),
                "Worker registered"
            );
        }
        Ok(())
    }

    /// Number of registered workers
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether no workers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Look up a worker
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers.get(id)
    }

    /// Iterate over all workers (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    /// The pool for a category, if any worker was ever registered under it
    #[must_use]
    pub fn pool(&self, category: WorkerCategory) -> Option<&CategoryPool> {
        self.pools.get(&category)
    }

    /// Categories that have a pool
    pub fn categories(&self) -> impl Iterator<Item = WorkerCategory> + '_ {
        self.pools.keys().copied()
    }

    /// Probe a worker and update its status
    ///
    /// Unknown ids return false without side effects. Otherwise the
    /// liveness check decides pass/fail: a pass yields Healthy when the
    /// worker has spare capacity and Degraded when it does not, a fail
    /// yields Unavailable. The probe time is stamped either way.
    ///
    /// Returns true iff the resulting status is Healthy.
    pub fn probe(&mut self, id: &str, rng: &mut dyn RngCore) -> bool {
        let Some(worker) = self.workers.get_mut(id) else {
            tracing::debug!(worker = %id, "Probe requested for unknown worker");
            return false;
        };

        let passed = self.liveness.check(worker, rng);
        let previous = worker.status;
        worker.status = if !passed {
            HealthStatus::Unavailable
        } else if worker.has_capacity() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        worker.last_probe = self.clock.now();

        self.metrics.probes.inc();
        if !passed {
            self.metrics.probe_failures.inc();
        }

        if worker.status == HealthStatus::Unavailable && previous != HealthStatus::Unavailable {
            tracing::warn!(worker = %id, previous = %previous, "Worker failed health probe");
        } else {
            tracing::debug!(
                worker = %id,
                status = %worker.status,
                load = worker.current_load,
                "Worker probed"
            );
        }

        worker.status == HealthStatus::Healthy
    }

    /// Ids of selectable workers in a category, in pool order
    ///
    /// Stale entries are re-probed first. Categories with no pool yield an
    /// empty list.
    pub fn eligible(&mut self, category: WorkerCategory, rng: &mut dyn RngCore) -> Vec<String> {
        let Some(pool) = self.pools.get(&category) else {
            return Vec::new();
        };
        let members = pool.members.clone();
        let now = self.clock.now();

        let mut eligible = Vec::with_capacity(members.len());
        for id in members {
            let stale = self
                .workers
                .get(&id)
                .is_some_and(|w| now.saturating_duration_since(w.last_probe) > self.staleness_interval);
            if stale {
                self.probe(&id, rng);
            }
            if self.workers.get(&id).is_some_and(|w| w.status.is_eligible()) {
                eligible.push(id);
            }
        }
        eligible
    }

    /// Round-robin pick among `candidates` using the category's cursor
    ///
    /// Returns `None` when `candidates` is empty or the category has no pool.
    pub fn round_robin_pick(
        &mut self,
        category: WorkerCategory,
        candidates: &[String],
    ) -> Option<String> {
        let pool = self.pools.get_mut(&category)?;
        round_robin_pick(candidates, &mut pool.cursor).cloned()
    }

    /// Reserve one unit of capacity on a worker
    ///
    /// Reservations are never refused; a worker may run past its ceiling.
    pub fn reserve(&mut self, id: &str) {
        if let Some(worker) = self.workers.get_mut(id) {
            worker.current_load += 1;
            if worker.current_load > worker.max_concurrent() {
                tracing::debug!(
                    worker = %id,
                    load = worker.current_load,
                    max = worker.max_concurrent(),
                    "Worker reserved beyond capacity"
                );
            }
        }
    }

    /// Release one unit of capacity, floored at zero
    ///
    /// Unknown ids are ignored. Returns true if the load was decremented.
    pub fn release(&mut self, id: &str) -> bool {
        let released = match self.workers.get_mut(id) {
            Some(worker) if worker.current_load > 0 => {
                worker.current_load -= 1;
                true
            }
            Some(_) => {
                tracing::debug!(worker = %id, "Release on idle worker ignored");
                false
            }
            None => {
                tracing::debug!(worker = %id, "Release for unknown worker ignored");
                false
            }
        };

        if released {
            self.metrics.releases.inc();
        } else {
            self.metrics.ignored_releases.inc();
        }
        released
    }

    /// Override a worker's status and mark it freshly probed
    ///
    /// Returns false for unknown ids.
    pub fn set_status(&mut self, id: &str, status: HealthStatus) -> bool {
        let now = self.clock.now();
        match self.workers.get_mut(id) {
            Some(worker) => {
                worker.status = status;
                worker.last_probe = now;
                tracing::info!(worker = %id, status = %status, "Worker status set");
                true
            }
            None => false,
        }
    }

    /// Fold an observed latency into a worker's rolling average
    ///
    /// Returns false for unknown ids.
    pub fn record_latency(&mut self, id: &str, latency_ms: f64) -> bool {
        match self.workers.get_mut(id) {
            Some(worker) => {
                worker.record_latency(latency_ms);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry_with(clock: ManualClock, success_rate: f64) -> WorkerRegistry {
        WorkerRegistry::new(
            Arc::new(clock),
            Box::new(RandomizedCheck::new(success_rate)),
            DEFAULT_STALENESS_INTERVAL,
            Arc::new(RouterMetrics::new()),
        )
    }

    fn profile(id: &str, category: WorkerCategory) -> WorkerProfile {
        WorkerProfile::new(id, category)
            .with_weight(0.9)
            .with_accuracy(0.9)
            .with_max_concurrent(2)
    }

    #[test]
    fn test_register_is_idempotent_per_pool() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        registry.register(profile("a", WorkerCategory::Medical)).unwrap();
        registry.register(profile("a", WorkerCategory::Medical)).unwrap();
        registry.register(profile("b", WorkerCategory::Medical)).unwrap();

        let pool = registry.pool(WorkerCategory::Medical).unwrap();
        assert_eq!(pool.members(), ["a".to_string(), "b".to_string()]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_keeps_cursor_after_first_insert() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        registry.register(profile("a", WorkerCategory::Legal)).unwrap();
        registry.register(profile("b", WorkerCategory::Legal)).unwrap();

        let candidates = registry.eligible(WorkerCategory::Legal, &mut rng);
        registry.round_robin_pick(WorkerCategory::Legal, &candidates);
        assert_eq!(registry.pool(WorkerCategory::Legal).unwrap().cursor(), 1);

        registry.register(profile("c", WorkerCategory::Legal)).unwrap();
        assert_eq!(registry.pool(WorkerCategory::Legal).unwrap().cursor(), 1);
    }

    #[test]
    fn test_reregister_under_new_category_moves_pool() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        registry.register(profile("a", WorkerCategory::Legal)).unwrap();
        registry.register(profile("a", WorkerCategory::Financial)).unwrap();

        assert!(registry.pool(WorkerCategory::Legal).unwrap().members().is_empty());
        assert_eq!(
            registry.pool(WorkerCategory::Financial).unwrap().members(),
            ["a".to_string()]
        );
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        let result = registry.register(profile("a", WorkerCategory::Legal).with_weight(0.0));
        assert!(matches!(result, Err(RouterError::InvalidProfile { .. })));
        assert!(registry.is_empty());
        assert!(registry.pool(WorkerCategory::Legal).is_none());
    }

    #[test]
    fn test_probe_unknown_worker() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!registry.probe("ghost", &mut rng));
    }

    #[test]
    fn test_probe_status_transitions() {
        let clock = ManualClock::new();
        let mut registry = registry_with(clock.clone(), 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        registry.register(profile("a", WorkerCategory::Medical)).unwrap();

        assert!(registry.probe("a", &mut rng));
        assert_eq!(registry.get("a").unwrap().status, HealthStatus::Healthy);

        // At capacity: passing probe degrades rather than heals
        registry.reserve("a");
        registry.reserve("a");
        clock.advance(Duration::from_secs(5));
        assert!(!registry.probe("a", &mut rng));
        let worker = registry.get("a").unwrap();
        assert_eq!(worker.status, HealthStatus::Degraded);
        assert_eq!(worker.last_probe, clock.now());
    }

    #[test]
    fn test_failed_probe_marks_unavailable() {
        let clock = ManualClock::new();
        let mut registry = registry_with(clock.clone(), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        registry.register(profile("a", WorkerCategory::Medical)).unwrap();

        clock.advance(Duration::from_secs(1));
        assert!(!registry.probe("a", &mut rng));
        let worker = registry.get("a").unwrap();
        assert_eq!(worker.status, HealthStatus::Unavailable);
        assert_eq!(worker.last_probe, clock.now());
    }

    #[test]
    fn test_eligible_excludes_unavailable_and_keeps_order() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        let mut rng = StdRng::seed_from_u64(0);
        for id in ["a", "b", "c"] {
            registry.register(profile(id, WorkerCategory::Technical)).unwrap();
        }
        registry.set_status("b", HealthStatus::Unavailable);
        registry.set_status("c", HealthStatus::Degraded);

        assert_eq!(
            registry.eligible(WorkerCategory::Technical, &mut rng),
            vec!["a".to_string(), "c".to_string()]
        );
        assert!(registry
            .eligible(WorkerCategory::Financial, &mut rng)
            .is_empty());
    }

    #[test]
    fn test_eligible_reprobes_only_stale_entries() {
        let clock = ManualClock::new();
        let mut registry = registry_with(clock.clone(), 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        registry.register(profile("a", WorkerCategory::Legal)).unwrap();

        // Fresh entry: failing check is never consulted
        clock.advance(DEFAULT_STALENESS_INTERVAL);
        assert_eq!(registry.eligible(WorkerCategory::Legal, &mut rng).len(), 1);

        clock.advance(Duration::from_millis(1));
        assert!(registry.eligible(WorkerCategory::Legal, &mut rng).is_empty());
    }

    #[test]
    fn test_release_floors_at_zero() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        registry.register(profile("a", WorkerCategory::Legal)).unwrap();

        registry.reserve("a");
        assert!(registry.release("a"));
        assert!(!registry.release("a"));
        assert!(!registry.release("ghost"));
        assert_eq!(registry.get("a").unwrap().current_load, 0);
    }

    #[test]
    fn test_reserve_runs_past_capacity() {
        let mut registry = registry_with(ManualClock::new(), 1.0);
        registry.register(profile("a", WorkerCategory::Legal)).unwrap();
        for _ in 0..5 {
            registry.reserve("a");
        }
        assert_eq!(registry.get("a").unwrap().current_load, 5);
    }
}
