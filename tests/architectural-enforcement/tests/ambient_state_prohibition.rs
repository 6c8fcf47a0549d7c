//! Integration Test: Ambient State Prohibition
//!
//! **Policy**: The router core takes its randomness, its clock and its state
//! from whoever constructs it. Production code in `adp/core/src` MUST NOT
//! reach for a global RNG, read the time directly, or keep static mutable
//! state.
//!
//! **Exceptions**: `clock.rs` (the only place allowed to read `Instant`),
//! test code.

use architectural_enforcement::find_violations;

const CORE_SRC: &str = "adp/core/src";

fn report(title: &str, violations: &[String]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ CRITICAL: {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) in {CORE_SRC}.\nFix these before merging!",
        violations.len()
    );
}

#[test]
fn test_no_ambient_randomness_in_core() {
    let violations = find_violations(
        CORE_SRC,
        &["thread_rng(", "rand::random", "OsRng", "rand::rngs::ThreadRng"],
        &[],
    );
    report(
        "Ambient randomness found in the router core! Take `&mut dyn RngCore` instead.",
        &violations,
    );
}

#[test]
fn test_no_direct_time_reads_in_core() {
    let violations = find_violations(
        CORE_SRC,
        &["Instant::now()", "SystemTime::now()", "chrono::"],
        &["clock.rs"],
    );
    report(
        "Direct time reads found in the router core! Ask the injected Clock.",
        &violations,
    );
}

#[test]
fn test_no_static_mutable_state_in_core() {
    let violations = find_violations(
        CORE_SRC,
        &["static mut", "lazy_static!", "thread_local!", "OnceLock<Mutex", "OnceCell<Mutex"],
        &[],
    );
    report("Static mutable state found in the router core!", &violations);
}

#[test]
fn test_no_sleep_in_core() {
    let violations = find_violations(CORE_SRC, &["::sleep(", ".sleep("], &[]);
    report(
        "Sleep calls found in the router core! Waiting is the orchestrator's job.",
        &violations,
    );
}
