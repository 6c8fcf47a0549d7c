//! Thread-safe Router Handle
//!
//! [`Router`] wraps a [`RoutingEngine`] in `Arc<Mutex<_>>` so any number of
//! orchestrator tasks can share it. Each call takes the lock once, which
//! keeps candidate filtering, selection and load reservation atomic with
//! respect to other callers. Metrics live outside the lock.
//!
//! ```text
//! orchestrator task ─┐
//! orchestrator task ─┼─> Router ─lock─> RoutingEngine ─> WorkerRegistry
//! completion task  ──┘      │
//!                           └─> Arc<RouterMetrics> (lock-free reads)
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::clock::{Clock, SystemClock};
use crate::config::RouterSettings;
use crate::engine::{RoutingEngine, DEFAULT_VALIDATOR_COUNT};
use crate::error::RouterError;
use crate::metrics::{MetricsSnapshot, RouterMetrics};
use crate::probe::{LivenessCheck, RandomizedCheck, DEFAULT_PROBE_SUCCESS_RATE};
use crate::registry::{WorkerRegistry, DEFAULT_STALENESS_INTERVAL};
use crate::request::{RoutingDecision, RoutingRequest};
use crate::stats::RouterStats;
use crate::worker::{HealthStatus, WorkerCategory, WorkerProfile, WorkerSnapshot};

/// Shareable handle to the routing engine
#[derive(Clone, Debug)]
pub struct Router {
    engine: Arc<Mutex<RoutingEngine>>,
    metrics: Arc<RouterMetrics>,
}

impl Default for Router {
    fn default() -> Self {
        RouterBuilder::new().build()
    }
}

impl Router {
    /// Start building a router
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Build a router from loaded settings and register its workers
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidProfile`] if a configured worker is
    /// invalid.
    pub fn from_settings(settings: &RouterSettings) -> Result<Self, RouterError> {
        let rng: Box<dyn RngCore + Send> = match settings.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };

        let router = RouterBuilder::new()
            .with_rng(rng)
            .with_staleness_interval(settings.staleness_interval)
            .with_probe_success_rate(settings.probe_success_rate)
            .with_default_validators(settings.default_validators)
            .build();

        for profile in &settings.workers {
            router.register(profile.clone())?;
        }

        tracing::info!(
            workers = settings.workers.len(),
            seeded = settings.seed.is_some(),
            "Router initialized"
        );
        Ok(router)
    }

    /// Register (or overwrite) a worker
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidProfile`] if the profile is invalid.
    pub fn register(&self, profile: WorkerProfile) -> Result<(), RouterError> {
        self.engine.lock().register(profile)
    }

    /// Route a request, reserving capacity on every selected worker
    pub fn route(&self, request: &RoutingRequest) -> RoutingDecision {
        self.engine.lock().route(request)
    }

    /// Release one unit of capacity on a worker
    pub fn release(&self, id: &str) -> bool {
        self.engine.lock().release(id)
    }

    /// Release every reservation held by a decision
    pub fn complete(&self, decision: &RoutingDecision) -> usize {
        self.engine.lock().complete(decision)
    }

    /// Probe a worker now
    pub fn probe(&self, id: &str) -> bool {
        self.engine.lock().probe(id)
    }

    /// Eligible worker ids for a category
    pub fn eligible(&self, category: WorkerCategory) -> Vec<String> {
        self.engine.lock().eligible(category)
    }

    /// Override a worker's status
    pub fn set_status(&self, id: &str, status: HealthStatus) -> bool {
        self.engine.lock().set_status(id, status)
    }

    /// Fold an observed latency into a worker's rolling average
    pub fn record_latency(&self, id: &str, latency_ms: f64) -> bool {
        self.engine.lock().record_latency(id, latency_ms)
    }

    /// Snapshot of one worker
    #[must_use]
    pub fn worker(&self, id: &str) -> Option<WorkerSnapshot> {
        self.engine.lock().worker(id)
    }

    /// Snapshots of all workers, sorted by id
    #[must_use]
    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.engine.lock().workers()
    }

    /// Aggregate health report
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        self.engine.lock().stats()
    }

    /// Shared metrics handle
    #[must_use]
    pub fn metrics(&self) -> Arc<RouterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Point-in-time copy of the metrics
    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Builder for [`Router`]
///
/// Every collaborator has a production default: the system clock, a
/// [`RandomizedCheck`] at the default success rate and an entropy-seeded
/// RNG.
pub struct RouterBuilder {
    clock: Arc<dyn Clock>,
    liveness: Option<Box<dyn LivenessCheck>>,
    probe_success_rate: f64,
    rng: Option<Box<dyn RngCore + Send>>,
    staleness_interval: Duration,
    default_validators: usize,
    metrics: Arc<RouterMetrics>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    /// Create a builder with production defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            liveness: None,
            probe_success_rate: DEFAULT_PROBE_SUCCESS_RATE,
            rng: None,
            staleness_interval: DEFAULT_STALENESS_INTERVAL,
            default_validators: DEFAULT_VALIDATOR_COUNT,
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Use a specific clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a specific liveness check (overrides the probe success rate)
    #[must_use]
    pub fn with_liveness(mut self, liveness: Box<dyn LivenessCheck>) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Set the pass probability of the default randomized liveness check
    #[must_use]
    pub fn with_probe_success_rate(mut self, rate: f64) -> Self {
        self.probe_success_rate = rate;
        self
    }

    /// Use a specific random source
    #[must_use]
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Seed a deterministic random source
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Set the age after which health entries are re-probed
    #[must_use]
    pub fn with_staleness_interval(mut self, interval: Duration) -> Self {
        self.staleness_interval = interval;
        self
    }

    /// Set the validator count used when a request does not specify one
    #[must_use]
    pub fn with_default_validators(mut self, count: usize) -> Self {
        self.default_validators = count;
        self
    }

    /// Share an existing metrics instance
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<RouterMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Build the router
    #[must_use]
    pub fn build(self) -> Router {
        let liveness = self
            .liveness
            .unwrap_or_else(|| Box::new(RandomizedCheck::new(self.probe_success_rate)));
        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::from_entropy()));

        let registry = WorkerRegistry::new(
            self.clock,
            liveness,
            self.staleness_interval,
            Arc::clone(&self.metrics),
        );
        let engine = RoutingEngine::new(registry, rng, Arc::clone(&self.metrics))
            .with_default_validators(self.default_validators);

        Router {
            engine: Arc::new(Mutex::new(engine)),
            metrics: self.metrics,
        }
    }
}
