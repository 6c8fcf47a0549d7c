//! Worker Model
//!
//! Types describing a Narrow Model worker: its category, static profile and
//! mutable runtime state.
//!
//! A worker is created once at registration and lives for the rest of the
//! process. The engine mutates its status on every probe and its load on
//! every selection and completion.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// Weight applied to the newest sample when folding observed latency into
/// the rolling average
const LATENCY_EMA_ALPHA: f64 = 0.3;

// ============================================================================
// Worker Category
// ============================================================================

/// Domain a worker specializes in
///
/// Every worker belongs to exactly one category and is only considered for
/// requests targeting that category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerCategory {
    /// Symptoms, treatments, diagnostics
    Medical,
    /// Contracts, compliance, regulation
    Legal,
    /// Security, infrastructure, engineering
    Technical,
    /// Markets, investment, risk
    Financial,
}

impl WorkerCategory {
    /// All categories, in declaration order
    pub const ALL: [WorkerCategory; 4] = [
        Self::Medical,
        Self::Legal,
        Self::Technical,
        Self::Financial,
    ];

    /// Lowercase wire name of the category
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::Legal => "legal",
            Self::Technical => "technical",
            Self::Financial => "financial",
        }
    }
}

impl fmt::Display for WorkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerCategory {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RouterError::UnknownCategory(s.to_string()))
    }
}

// ============================================================================
// Health Status
// ============================================================================

/// Health of a worker as of its last probe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Passed its last probe with spare capacity
    #[default]
    Healthy,

    /// Passed its last probe while at or above capacity
    Degraded,

    /// Failed its last probe
    Unavailable,
}

impl HealthStatus {
    /// Whether a worker in this state may be selected
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

// ============================================================================
// Worker Profile
// ============================================================================

/// Static description of a worker, supplied at registration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    /// Unique worker identifier
    pub id: String,

    /// Category this worker serves
    pub category: WorkerCategory,

    /// Endpoint descriptor (stored, never dialed)
    #[serde(default)]
    pub endpoint: String,

    /// Capability tags, in declaration order
    #[serde(default)]
    pub capabilities: Vec<String>,

    /// Base selection weight (0.1 - 1.0)
    pub weight: f64,

    /// Initial estimate of the average response latency in milliseconds
    pub avg_latency_ms: f64,

    /// Initial accuracy estimate (0.0 - 1.0)
    pub accuracy: f64,

    /// Maximum concurrent requests before the worker counts as saturated
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
}

fn default_max_concurrent() -> u32 {
    10
}

impl WorkerProfile {
    /// Create a profile with neutral defaults
    pub fn new(id: impl Into<String>, category: WorkerCategory) -> Self {
        Self {
            id: id.into(),
            category,
            endpoint: String::new(),
            capabilities: Vec::new(),
            weight: 1.0,
            avg_latency_ms: 1000.0,
            accuracy: 1.0,
            max_concurrent: default_max_concurrent(),
        }
    }

    /// Set the endpoint descriptor
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the capability tags
    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the base selection weight
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the initial latency estimate
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.avg_latency_ms = latency_ms;
        self
    }

    /// Set the initial accuracy estimate
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the concurrency ceiling
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Check that every field is inside the range the scoring formula expects
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidProfile`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RouterError> {
        let invalid = |reason: String| RouterError::InvalidProfile {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if !(0.1..=1.0).contains(&self.weight) {
            return Err(invalid(format!(
                "weight {} outside 0.1..=1.0",
                self.weight
            )));
        }
        if !(0.0..=1.0).contains(&self.accuracy) {
            return Err(invalid(format!(
                "accuracy {} outside 0.0..=1.0",
                self.accuracy
            )));
        }
        if !self.avg_latency_ms.is_finite() || self.avg_latency_ms <= 0.0 {
            return Err(invalid(format!(
                "average latency {}ms must be positive",
                self.avg_latency_ms
            )));
        }
        if self.max_concurrent == 0 {
            return Err(invalid("max_concurrent must be at least 1".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Worker
// ============================================================================

/// A registered worker: static profile plus runtime state
#[derive(Clone, Debug)]
pub struct Worker {
    /// Profile supplied at registration
    pub profile: WorkerProfile,
    /// Status as of the last probe
    pub status: HealthStatus,
    /// Rolling average response latency (ms)
    pub avg_latency_ms: f64,
    /// Accuracy score (0.0 - 1.0)
    pub accuracy: f64,
    /// When the worker was last probed
    pub last_probe: Instant,
    /// Requests currently reserved on this worker
    pub current_load: u32,
}

impl Worker {
    /// Create a fresh, healthy, idle worker probed at `now`
    #[must_use]
    pub fn new(profile: WorkerProfile, now: Instant) -> Self {
        Self {
            avg_latency_ms: profile.avg_latency_ms,
            accuracy: profile.accuracy,
            profile,
            status: HealthStatus::Healthy,
            last_probe: now,
            current_load: 0,
        }
    }

    /// Worker identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.profile.id
    }

    /// Worker category
    #[must_use]
    pub fn category(&self) -> WorkerCategory {
        self.profile.category
    }

    /// Concurrency ceiling
    #[must_use]
    pub fn max_concurrent(&self) -> u32 {
        self.profile.max_concurrent
    }

    /// Whether the worker has spare capacity
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.current_load < self.profile.max_concurrent
    }

    /// Fold an observed latency into the rolling average
    pub fn record_latency(&mut self, latency_ms: f64) {
        if !latency_ms.is_finite() || latency_ms <= 0.0 {
            return;
        }
        self.avg_latency_ms =
            LATENCY_EMA_ALPHA * latency_ms + (1.0 - LATENCY_EMA_ALPHA) * self.avg_latency_ms;
    }

    /// Owned, serializable view of the worker
    #[must_use]
    pub fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            id: self.profile.id.clone(),
            category: self.profile.category,
            endpoint: self.profile.endpoint.clone(),
            capabilities: self.profile.capabilities.clone(),
            weight: self.profile.weight,
            status: self.status,
            avg_latency_ms: self.avg_latency_ms,
            accuracy: self.accuracy,
            current_load: self.current_load,
            max_concurrent: self.profile.max_concurrent,
        }
    }
}

/// Point-in-time copy of a worker for status surfaces
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkerSnapshot {
    /// Worker identifier
    pub id: String,
    /// Worker category
    pub category: WorkerCategory,
    /// Endpoint descriptor
    pub endpoint: String,
    /// Capability tags
    pub capabilities: Vec<String>,
    /// Base selection weight
    pub weight: f64,
    /// Status as of the last probe
    pub status: HealthStatus,
    /// Rolling average latency (ms)
    pub avg_latency_ms: f64,
    /// Accuracy score
    pub accuracy: f64,
    /// Requests currently reserved
    pub current_load: u32,
    /// Concurrency ceiling
    pub max_concurrent: u32,
}
