//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No ambient randomness in the router core (the RNG is injected)
//! - No direct time reads outside the clock module
//! - No static mutable state
//! - No sleep() calls in the router core
//!
//! The helpers below walk production sources and hand back code lines with
//! comments stripped. Scanning a file stops at its `#[cfg(test)]` module.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_sources(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Production code lines of a source file as `(line_number, code)`
///
/// Line comments are stripped and doc comments skipped. Everything from the
/// first `#[cfg(test)]` onward is ignored.
#[must_use]
pub fn production_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push((idx + 1, code.to_string()));
    }
    lines
}

/// Find production lines containing any of `patterns`
///
/// Files whose path ends with one of `allowed_files` are skipped.
#[must_use]
pub fn find_violations(dir: &str, patterns: &[&str], allowed_files: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();

    for path in rust_sources(dir) {
        if allowed_files.iter().any(|allowed| path.ends_with(allowed)) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };

        for (line_number, code) in production_lines(&content) {
            if let Some(pattern) = patterns.iter().find(|p| code.contains(*p)) {
                violations.push(format!(
                    "{}:{} - `{}` in: {}",
                    path.display(),
                    line_number,
                    pattern,
                    code.trim()
                ));
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// rand::random\n#[cfg(test)]\nmod tests { fn b() {} }\n";
        let lines = production_lines(source);
        assert_eq!(lines, vec![(1, "fn a() {}".to_string())]);
    }

    #[test]
    fn test_trailing_comments_are_stripped() {
        let lines = production_lines("let x = 1; // thread_rng()\n");
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].1.contains("thread_rng"));
    }

    #[test]
    fn test_core_sources_are_found() {
        let files = rust_sources("adp/core/src");
        assert!(files.iter().any(|p| p.ends_with("lib.rs")));
        assert!(files.iter().any(|p| p.ends_with("clock.rs")));
    }
}
