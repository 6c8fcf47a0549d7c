//! ADP Core - Routing and Selection for Narrow Model Workers
//!
//! This crate decides which backend worker handles a request under the
//! Alignment Delegation Protocol. Workers are grouped by category, their
//! health is tracked lazily, and a primary (plus optional independent
//! validators) is picked by priority-dependent strategy. It performs no
//! network I/O: dispatching to the chosen workers is the caller's job.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                          │
//! │        route(request)            release(id) / complete()    │
//! └───────────────┬─────────────────────────────┬────────────────┘
//!                 │                             │
//! ┌───────────────┼─────────────────────────────┼────────────────┐
//! │               v           ADP CORE          v                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          Router  (Arc<Mutex<RoutingEngine>>)           │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  │  │
//! │  │  │  Selection   │  │   Worker     │  │   Metrics    │  │  │
//! │  │  │ weighted/RR  │  │  Registry    │  │  (atomics)   │  │  │
//! │  │  └──────────────┘  └──────┬───────┘  └──────────────┘  │  │
//! │  └───────────────────────────┼────────────────────────────┘  │
//! │                    ┌─────────┴─────────┐                     │
//! │                    │  Clock  Liveness  │  (injected)         │
//! │                    └───────────────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Router`]: Thread-safe handle; the usual entry point
//! - [`RoutingEngine`]: Single-owner engine behind the router
//! - [`WorkerRegistry`]: Workers, category pools and health tracking
//! - [`RoutingRequest`] / [`RoutingDecision`]: Per-call input and output
//! - [`RouterStats`]: Aggregate health report
//! - [`RouterSettings`]: Configuration loaded from TOML and the environment
//!
//! # Quick Start
//!
//! ```ignore
//! use adp_core::{Priority, Router, RoutingRequest, WorkerCategory, WorkerProfile};
//!
//! let router = Router::builder().with_seed(42).build();
//! router.register(
//!     WorkerProfile::new("nm-medical-001", WorkerCategory::Medical)
//!         .with_weight(0.9)
//!         .with_accuracy(0.94)
//!         .with_latency_ms(850.0),
//! )?;
//!
//! let request = RoutingRequest::new(WorkerCategory::Medical)
//!     .with_priority(Priority::Urgent)
//!     .with_validation();
//! let decision = router.route(&request);
//!
//! // ... dispatch to decision.primary and decision.validators ...
//!
//! router.complete(&decision);
//! ```
//!
//! # Module Overview
//!
//! - [`worker`]: Worker categories, profiles and runtime state
//! - [`registry`]: Registry, category pools and lazy health refresh
//! - [`probe`]: Liveness check policies
//! - [`clock`]: Injectable time source
//! - [`selection`]: Scoring, weighted and round-robin picks
//! - [`engine`]: Primary selection, validator fan-out and reservations
//! - [`router`]: Shareable router handle and builder
//! - [`request`]: Requests, priorities and decisions
//! - [`stats`]: Aggregate health report
//! - [`metrics`]: Lock-free counters
//! - [`config`]: TOML and environment configuration

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod registry;
pub mod request;
pub mod router;
pub mod selection;
pub mod stats;
pub mod worker;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{RoutingEngine, DEFAULT_VALIDATOR_COUNT};
pub use error::RouterError;
pub use metrics::{MetricsSnapshot, RouterMetrics};
pub use probe::{LivenessCheck, RandomizedCheck, DEFAULT_PROBE_SUCCESS_RATE};
pub use registry::{CategoryPool, WorkerRegistry, DEFAULT_STALENESS_INTERVAL};
pub use request::{Priority, RoutingDecision, RoutingRequest, SelectionStrategy};
pub use router::{Router, RouterBuilder};
pub use stats::{CategoryStats, RouterStats, SystemHealth};
pub use worker::{HealthStatus, Worker, WorkerCategory, WorkerProfile, WorkerSnapshot};

// Config exports
pub use config::{
    default_config_path, default_fleet, load_config, load_config_from_path, ConfigError,
    RouterSettings, RouterToml,
};
