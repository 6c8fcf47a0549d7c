//! Routing Requests and Decisions
//!
//! The values exchanged with the orchestrator on every `route` call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::worker::WorkerCategory;

// ============================================================================
// Priority
// ============================================================================

/// Request priority; selects the primary-selection strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Fair rotation across eligible workers
    #[default]
    Normal,
    /// Rotation followed by a re-scoring hook
    High,
    /// Best-positioned worker by weighted draw
    Urgent,
}

impl Priority {
    /// Lowercase wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse: anything that is not `urgent` or `high` is Normal
impl From<&str> for Priority {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "urgent" => Self::Urgent,
            "high" => Self::High,
            _ => Self::Normal,
        }
    }
}

// ============================================================================
// Routing Request
// ============================================================================

/// One routing question: which worker(s) should handle this request?
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRequest {
    /// Unique request ID
    pub request_id: String,

    /// Category whose pool supplies the candidates
    pub category: WorkerCategory,

    /// Priority level
    pub priority: Priority,

    /// Whether independent validators should be selected
    pub requires_validation: bool,

    /// Number of validators wanted (engine default when `None`)
    pub validator_count: Option<usize>,
}

impl RoutingRequest {
    /// Create a normal-priority request without validation
    #[must_use]
    pub fn new(category: WorkerCategory) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            category,
            priority: Priority::Normal,
            requires_validation: false,
            validator_count: None,
        }
    }

    /// Set the request ID
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Set the priority
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Ask for validators using the engine's default count
    #[must_use]
    pub fn with_validation(mut self) -> Self {
        self.requires_validation = true;
        self
    }

    /// Ask for a specific number of validators
    #[must_use]
    pub fn with_validators(mut self, count: usize) -> Self {
        self.requires_validation = true;
        self.validator_count = Some(count);
        self
    }
}

// ============================================================================
// Routing Decision
// ============================================================================

/// Strategy used to pick the primary worker
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Weighted draw over every eligible worker (urgent)
    Weighted,
    /// Round-robin pick re-scored on its own (high)
    RoundRobinWeighted,
    /// Plain round-robin (normal)
    RoundRobin,
    /// No eligible worker existed
    NoAvailableWorkers,
}

impl SelectionStrategy {
    /// Strategy for a priority level
    #[must_use]
    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Urgent => Self::Weighted,
            Priority::High => Self::RoundRobinWeighted,
            Priority::Normal => Self::RoundRobin,
        }
    }

    /// Snake-case tag reported to callers
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "weighted",
            Self::RoundRobinWeighted => "round_robin_weighted",
            Self::RoundRobin => "round_robin",
            Self::NoAvailableWorkers => "no_available_workers",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a routing call
///
/// Every id in [`RoutingDecision::reserved_ids`] holds one unit of capacity
/// that the caller must release exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// ID of the request this answers
    pub request_id: String,

    /// Category that was routed
    pub category: WorkerCategory,

    /// Priority that was routed
    pub priority: Priority,

    /// Selected primary worker, if any was eligible
    pub primary: Option<String>,

    /// Validators, distinct from the primary and from each other
    pub validators: Vec<String>,

    /// How the primary was chosen
    pub strategy: SelectionStrategy,

    /// Number of eligible candidates considered
    pub candidates_considered: usize,
}

impl RoutingDecision {
    /// Whether a primary worker was selected
    #[must_use]
    pub fn is_routed(&self) -> bool {
        self.primary.is_some()
    }

    /// Every worker id holding a reservation for this decision
    pub fn reserved_ids(&self) -> impl Iterator<Item = &str> {
        self.primary
            .iter()
            .chain(self.validators.iter())
            .map(String::as_str)
    }
}
