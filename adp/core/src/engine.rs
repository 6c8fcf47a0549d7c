//! Routing Engine
//!
//! Turns a [`RoutingRequest`] into a [`RoutingDecision`]:
//!
//! ```text
//! 1. List eligible workers for the category (stale entries re-probed)
//! 2. Pick a primary by priority
//!      urgent -> weighted draw over all candidates
//!      high   -> round-robin, then weighted draw over that single worker
//!      normal -> round-robin
//! 3. Reserve one unit of load on the primary
//! 4. If validation is requested, draw validators from the remaining
//!    candidates (weighted, without replacement) and reserve each
//! ```
//!
//! An empty candidate list is a normal outcome tagged
//! [`SelectionStrategy::NoAvailableWorkers`].
//!
//! The engine is a single-owner value. Share it across threads through
//! [`Router`](crate::Router), which serializes every call behind one lock.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::RouterError;
use crate::metrics::RouterMetrics;
use crate::registry::WorkerRegistry;
use crate::request::{Priority, RoutingDecision, RoutingRequest, SelectionStrategy};
use crate::selection::{selection_score, weighted_index};
use crate::stats::RouterStats;
use crate::worker::{HealthStatus, WorkerCategory, WorkerProfile, WorkerSnapshot};

/// Validators selected when a request asks for validation without a count
pub const DEFAULT_VALIDATOR_COUNT: usize = 1;

/// The routing and selection engine
pub struct RoutingEngine {
    registry: WorkerRegistry,
    rng: Box<dyn RngCore + Send>,
    default_validators: usize,
    metrics: Arc<RouterMetrics>,
}

impl fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("registry", &self.registry)
            .field("default_validators", &self.default_validators)
            .finish_non_exhaustive()
    }
}

impl Default for RoutingEngine {
    fn default() -> Self {
        let metrics = Arc::new(RouterMetrics::new());
        let registry = WorkerRegistry::new(
            Arc::new(crate::clock::SystemClock),
            Box::new(crate::probe::RandomizedCheck::default()),
            crate::registry::DEFAULT_STALENESS_INTERVAL,
            Arc::clone(&metrics),
        );
        Self::new(registry, Box::new(StdRng::from_entropy()), metrics)
    }
}

impl RoutingEngine {
    /// Create an engine over a registry with an injected random source
    ///
    /// `metrics` should be the same handle the registry was built with so
    /// probe and decision counters land in one place.
    #[must_use]
    pub fn new(
        registry: WorkerRegistry,
        rng: Box<dyn RngCore + Send>,
        metrics: Arc<RouterMetrics>,
    ) -> Self {
        Self {
            registry,
            rng,
            default_validators: DEFAULT_VALIDATOR_COUNT,
            metrics,
        }
    }

    /// Set the validator count used when a request does not specify one
    #[must_use]
    pub fn with_default_validators(mut self, count: usize) -> Self {
        self.default_validators = count;
        self
    }

    /// Underlying registry
    #[must_use]
    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Shared metrics handle
    #[must_use]
    pub fn metrics(&self) -> Arc<RouterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Register (or overwrite) a worker
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidProfile`] if the profile is invalid.
    pub fn register(&mut self, profile: WorkerProfile) -> Result<(), RouterError> {
        self.registry.register(profile)
    }

    /// Probe a worker now; true iff it ends up Healthy
    pub fn probe(&mut self, id: &str) -> bool {
        self.registry.probe(id, self.rng.as_mut())
    }

    /// Eligible worker ids for a category, refreshing stale entries
    pub fn eligible(&mut self, category: WorkerCategory) -> Vec<String> {
        self.registry.eligible(category, self.rng.as_mut())
    }

    /// Weighted pick among worker ids; unknown ids are skipped
    pub fn weighted_pick(&mut self, candidates: &[String]) -> Option<String> {
        let known: Vec<&String> = candidates
            .iter()
            .filter(|id| self.registry.get(id).is_some())
            .collect();
        let scores: Vec<f64> = known
            .iter()
            .filter_map(|id| self.registry.get(id))
            .map(selection_score)
            .collect();
        weighted_index(&scores, self.rng.as_mut()).map(|index| known[index].clone())
    }

    /// Round-robin pick among worker ids using the category's cursor
    pub fn round_robin_pick(
        &mut self,
        candidates: &[String],
        category: WorkerCategory,
    ) -> Option<String> {
        self.registry.round_robin_pick(category, candidates)
    }

    /// Route a request
    ///
    /// Reserves one unit of load on every worker in the returned decision.
    pub fn route(&mut self, request: &RoutingRequest) -> RoutingDecision {
        let candidates = self.eligible(request.category);
        let candidates_considered = candidates.len();

        if candidates.is_empty() {
            tracing::info!(
                request_id = %request.request_id,
                category = %request.category,
                "No available workers for category"
            );
            let strategy = SelectionStrategy::NoAvailableWorkers;
            self.metrics.record_decision(strategy, 0);
            return RoutingDecision {
                request_id: request.request_id.clone(),
                category: request.category,
                priority: request.priority,
                primary: None,
                validators: Vec::new(),
                strategy,
                candidates_considered,
            };
        }

        let strategy = SelectionStrategy::for_priority(request.priority);
        let primary = self.select_primary(request.priority, request.category, &candidates);

        if let Some(ref id) = primary {
            self.registry.reserve(id);
        }

        let validators = match primary {
            Some(ref id) if request.requires_validation => {
                let count = request.validator_count.unwrap_or(self.default_validators);
                self.select_validators(&candidates, id, count)
            }
            _ => Vec::new(),
        };

        self.metrics.record_decision(strategy, validators.len());
        tracing::debug!(
            request_id = %request.request_id,
            category = %request.category,
            priority = %request.priority,
            strategy = %strategy,
            primary = ?primary,
            validators = ?validators,
            candidates = candidates_considered,
            "Request routed"
        );

        RoutingDecision {
            request_id: request.request_id.clone(),
            category: request.category,
            priority: request.priority,
            primary,
            validators,
            strategy,
            candidates_considered,
        }
    }

    fn select_primary(
        &mut self,
        priority: Priority,
        category: WorkerCategory,
        candidates: &[String],
    ) -> Option<String> {
        match priority {
            Priority::Urgent => self.weighted_pick(candidates),
            Priority::High => {
                // Re-score the rotation's pick on its own; a hook for vetoing
                // or re-ranking a constrained set.
                let pick = self.round_robin_pick(candidates, category)?;
                self.weighted_pick(std::slice::from_ref(&pick))
            }
            Priority::Normal => self.round_robin_pick(candidates, category),
        }
    }

    fn select_validators(
        &mut self,
        candidates: &[String],
        primary: &str,
        count: usize,
    ) -> Vec<String> {
        let mut pool: Vec<String> = candidates
            .iter()
            .filter(|id| id.as_str() != primary)
            .cloned()
            .collect();

        let mut validators = Vec::with_capacity(count.min(pool.len()));
        while validators.len() < count && !pool.is_empty() {
            let scores: Vec<f64> = pool
                .iter()
                .map(|id| self.registry.get(id).map_or(0.0, selection_score))
                .collect();
            let Some(index) = weighted_index(&scores, self.rng.as_mut()) else {
                break;
            };
            let id = pool.remove(index);
            self.registry.reserve(&id);
            validators.push(id);
        }
        validators
    }

    /// Release one unit of load on a worker; unknown ids are ignored
    pub fn release(&mut self, id: &str) -> bool {
        self.registry.release(id)
    }

    /// Release every reservation held by a decision
    ///
    /// Returns the number of workers whose load was decremented.
    pub fn complete(&mut self, decision: &RoutingDecision) -> usize {
        decision
            .reserved_ids()
            .filter(|id| self.registry.release(id))
            .count()
    }

    /// Override a worker's status
    pub fn set_status(&mut self, id: &str, status: HealthStatus) -> bool {
        self.registry.set_status(id, status)
    }

    /// Fold an observed latency into a worker's rolling average
    pub fn record_latency(&mut self, id: &str, latency_ms: f64) -> bool {
        self.registry.record_latency(id, latency_ms)
    }

    /// Snapshot of one worker
    #[must_use]
    pub fn worker(&self, id: &str) -> Option<WorkerSnapshot> {
        self.registry.get(id).map(crate::worker::Worker::snapshot)
    }

    /// Snapshots of all workers, sorted by id
    #[must_use]
    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        let mut workers: Vec<WorkerSnapshot> =
            self.registry.iter().map(crate::worker::Worker::snapshot).collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        workers
    }

    /// Aggregate health report
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats::collect(&self.registry)
    }
}
