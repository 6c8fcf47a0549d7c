//! ADP Console - Orchestrator for the ADP Router
//!
//! Loads the router configuration, registers the worker fleet, routes a
//! batch of requests and simulates each selected worker finishing its share
//! of the work. Once every simulated worker has reported back, a JSON status
//! report is written to stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # One normal-priority medical request against the demo fleet
//! adp-console
//!
//! # Ten urgent legal requests with two validators each, reproducibly
//! adp-console --category legal --priority urgent --validators 2 --requests 10 --seed 42
//!
//! # Custom fleet
//! adp-console --config ./router.toml
//!
//! # Verbose logging
//! RUST_LOG=adp_core=debug adp-console
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use adp_core::{
    default_config_path, load_config_from_path, MetricsSnapshot, Priority, Router, RouterStats,
    RoutingDecision, RoutingRequest, WorkerCategory, WorkerSnapshot,
};

/// Simulated work is this many times faster than the latency it reports
const SIMULATION_SPEEDUP: f64 = 100.0;

/// Spread of simulated latency around a worker's rolling average
const LATENCY_JITTER: f64 = 0.2;

/// ADP Console - route requests to Narrow Model workers
#[derive(Parser, Debug)]
#[command(name = "adp-console")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "ADP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Worker category to route to (medical, legal, technical, financial)
    #[arg(long, default_value = "medical")]
    category: String,

    /// Request priority (normal, high, urgent)
    #[arg(short = 'p', long, default_value = "normal")]
    priority: String,

    /// Select validators using the configured default count
    #[arg(long)]
    validate: bool,

    /// Number of validators per request (implies --validate)
    #[arg(long, value_name = "N")]
    validators: Option<usize>,

    /// Number of requests to route
    #[arg(short = 'n', long, default_value_t = 1)]
    requests: usize,

    /// Seed for selection and simulated latency (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "ADP_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Report printed once all simulated work has completed
#[derive(Debug, Serialize)]
struct StatusReport {
    timestamp: DateTime<Utc>,
    routing_stats: RouterStats,
    metrics: MetricsSnapshot,
    workers: Vec<WorkerSnapshot>,
    decisions: Vec<RoutingDecision>,
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("adp_console={level},adp_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn build_request(args: &Args, category: WorkerCategory, priority: Priority) -> RoutingRequest {
    let request = RoutingRequest::new(category).with_priority(priority);
    match args.validators {
        Some(count) => request.with_validators(count),
        None if args.validate => request.with_validation(),
        None => request,
    }
}

/// Sleep for a scaled-down latency, then report it and free the worker
async fn simulate_worker(router: Router, worker_id: String, latency_ms: f64) {
    tokio::time::sleep(Duration::from_secs_f64(latency_ms / SIMULATION_SPEEDUP / 1000.0)).await;

    router.record_latency(&worker_id, latency_ms);
    if !router.release(&worker_id) {
        warn!(worker = %worker_id, "Completion for worker with no reservation");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let category: WorkerCategory = args
        .category
        .parse()
        .with_context(|| format!("Invalid --category '{}'", args.category))?;
    let priority = Priority::from(args.priority.as_str());

    let config_path = args.config.clone().or_else(default_config_path);
    let mut settings =
        load_config_from_path(config_path).context("Failed to load router configuration")?;
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    let router = Router::from_settings(&settings).context("Failed to register worker fleet")?;
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    info!(
        category = %category,
        priority = %priority,
        requests = args.requests,
        "Routing requests"
    );

    let mut completions = JoinSet::new();
    let mut decisions = Vec::with_capacity(args.requests);
    for _ in 0..args.requests {
        let decision = router.route(&build_request(&args, category, priority));
        if !decision.is_routed() {
            warn!(request_id = %decision.request_id, "Request could not be routed");
        }

        for id in decision.reserved_ids() {
            let base = router.worker(id).map_or(1000.0, |w| w.avg_latency_ms);
            let latency_ms = base * rng.gen_range(1.0 - LATENCY_JITTER..=1.0 + LATENCY_JITTER);
            completions.spawn(simulate_worker(router.clone(), id.to_string(), latency_ms));
        }
        decisions.push(decision);
    }

    while let Some(result) = completions.join_next().await {
        result.context("Simulated worker task failed")?;
    }

    let report = StatusReport {
        timestamp: Utc::now(),
        routing_stats: router.stats(),
        metrics: router.metrics_snapshot(),
        workers: router.workers(),
        decisions,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize status report")?
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["adp-console"]);
        assert_eq!(args.category, "medical");
        assert_eq!(args.priority, "normal");
        assert_eq!(args.requests, 1);
        assert!(!args.validate);
        assert_eq!(args.validators, None);
    }

    #[test]
    fn test_build_request_validation_flags() {
        let args = Args::parse_from(["adp-console", "--validate"]);
        let request = build_request(&args, WorkerCategory::Legal, Priority::High);
        assert!(request.requires_validation);
        assert_eq!(request.validator_count, None);

        let args = Args::parse_from(["adp-console", "--validators", "3"]);
        let request = build_request(&args, WorkerCategory::Legal, Priority::High);
        assert_eq!(request.validator_count, Some(3));

        let args = Args::parse_from(["adp-console"]);
        assert!(!build_request(&args, WorkerCategory::Legal, Priority::Normal).requires_validation);
    }

    #[tokio::test]
    async fn test_simulated_worker_releases_capacity() {
        let router = Router::builder().with_seed(1).build();
        router
            .register(adp_core::WorkerProfile::new("w", WorkerCategory::Technical))
            .unwrap();
        let decision = router.route(&RoutingRequest::new(WorkerCategory::Technical));
        assert_eq!(router.worker("w").unwrap().current_load, 1);

        simulate_worker(router.clone(), "w".to_string(), 500.0).await;

        let worker = router.worker("w").unwrap();
        assert_eq!(worker.current_load, 0);
        assert!(worker.avg_latency_ms < 1000.0);
        assert!(decision.is_routed());
    }
}
