//! Aggregate Health Report
//!
//! Summarizes the registry for status surfaces: per-category health counts,
//! the overall healthy fraction, and total in-flight load. Building a report
//! reads the last known status of each worker; it never triggers probes.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::registry::WorkerRegistry;
use crate::worker::{HealthStatus, WorkerCategory};

/// Healthy fraction at or above which the system reports Healthy
const HEALTHY_THRESHOLD: f64 = 0.8;

/// Healthy fraction at or above which the system reports Degraded
const DEGRADED_THRESHOLD: f64 = 0.5;

/// Health counts for one category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    /// Workers registered in the category
    pub total: usize,
    /// Workers whose last probe left them Healthy
    pub healthy: usize,
    /// Workers whose last probe left them Degraded
    pub degraded: usize,
    /// Workers whose last probe left them Unavailable
    pub unavailable: usize,
}

impl CategoryStats {
    fn count(&mut self, status: HealthStatus) {
        self.total += 1;
        match status {
            HealthStatus::Healthy => self.healthy += 1,
            HealthStatus::Degraded => self.degraded += 1,
            HealthStatus::Unavailable => self.unavailable += 1,
        }
    }
}

/// Coarse label for the whole fleet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemHealth {
    /// At least 80% of workers are healthy
    Healthy,
    /// At least half of the workers are healthy
    Degraded,
    /// Fewer than half of the workers are healthy
    Critical,
    /// No workers are registered
    Offline,
}

impl fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Critical => write!(f, "CRITICAL"),
            Self::Offline => write!(f, "OFFLINE"),
        }
    }
}

/// Aggregate health report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouterStats {
    /// Registered workers across all categories
    pub total_workers: usize,
    /// Counts per category that has a pool
    pub categories: BTreeMap<WorkerCategory, CategoryStats>,
    /// Healthy workers divided by total workers (0 with no workers)
    pub overall_health: f64,
    /// Sum of current load across all workers
    pub in_flight: u64,
    /// Coarse label derived from `overall_health`
    pub system_health: SystemHealth,
}

impl RouterStats {
    /// Build a report from the registry's current state
    #[must_use]
    pub fn collect(registry: &WorkerRegistry) -> Self {
        let mut categories: BTreeMap<WorkerCategory, CategoryStats> = registry
            .categories()
            .map(|category| (category, CategoryStats::default()))
            .collect();

        let mut healthy = 0usize;
        let mut in_flight = 0u64;
        for worker in registry.iter() {
            categories
                .entry(worker.category())
                .or_default()
                .count(worker.status);
            if worker.status == HealthStatus::Healthy {
                healthy += 1;
            }
            in_flight += u64::from(worker.current_load);
        }

        let total_workers = registry.len();
        let overall_health = if total_workers == 0 {
            0.0
        } else {
            healthy as f64 / total_workers as f64
        };

        Self {
            total_workers,
            categories,
            overall_health,
            in_flight,
            system_health: classify(total_workers, overall_health),
        }
    }

    /// Counts for one category (zeroes if it has no pool)
    #[must_use]
    pub fn category(&self, category: WorkerCategory) -> CategoryStats {
        self.categories.get(&category).copied().unwrap_or_default()
    }
}

fn classify(total_workers: usize, overall_health: f64) -> SystemHealth {
    if total_workers == 0 {
        SystemHealth::Offline
    } else if overall_health >= HEALTHY_THRESHOLD {
        SystemHealth::Healthy
    } else if overall_health >= DEGRADED_THRESHOLD {
        SystemHealth::Degraded
    } else {
        SystemHealth::Critical
    }
}
