//! Architecture guard tests for the turncache workspace.
//!
//! These tests scan source files to enforce design-level consistency:
//! - Error types derive thiserror instead of hand-written Display
//! - No `Result<_, String>` in turncache-core
//! - No `unwrap()`/`expect()` outside test code in turncache-core
//! - File size limits
//! - Every declared dependency is referenced from its crate's sources
//!
//! Run: `cargo test --package turncache-core --test architecture_guards -- --nocapture`

use std::fs;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Simple recursive directory walk (no external dep).
fn walkdir(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(walkdir(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

/// Non-test `.rs` files under `dir`.
fn source_files(dir: &Path) -> Vec<PathBuf> {
    walkdir(dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "rs"))
        .filter(|p| !is_test_file(p))
        .collect()
}

fn is_test_file(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.contains("/tests/") || s.ends_with("/tests.rs") || s.ends_with("_tests.rs")
}

/// Return the workspace root (two levels up from turncache-core/).
fn workspace_root() -> PathBuf {
    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("cannot determine workspace root")
        .to_path_buf()
}

/// Source lines before the first inline test module.
fn production_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim().starts_with("#[cfg(test)]"))
        .map(|(i, line)| (i + 1, line))
}

fn rel(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn report(rule: &str, hint: &str, violations: &[(String, usize, String)]) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("\n[{rule}] {hint}\n\n");
    for (file, line, text) in violations {
        msg.push_str(&format!("  {}:{} -> {}\n", file, line, text));
    }
    panic!("{msg}");
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[test]
fn test_error_types_use_thiserror() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for file in source_files(&root.join("crates")) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (n, line) in production_lines(&content) {
            let trimmed = line.trim();
            if trimmed.starts_with("impl")
                && trimmed.contains("Display for")
                && trimmed.contains("Error")
            {
                violations.push((rel(&file, &root), n, trimmed.to_string()));
            }
        }
    }

    report(
        "ERR-01",
        "Hand-written Display for Error types. Use #[derive(thiserror::Error)].",
        &violations,
    );
}

#[test]
fn test_no_result_string_in_core() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for file in source_files(&root.join("crates/turncache-core/src")) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (n, line) in production_lines(&content) {
            let compact: String = line.split_whitespace().collect();
            if compact.contains("Result<") && compact.contains(",String>") {
                violations.push((rel(&file, &root), n, line.trim().to_string()));
            }
        }
    }

    report(
        "ERR-02",
        "Result<_, String> in turncache-core. Return CacheResult<T>.",
        &violations,
    );
}

#[test]
fn test_no_panicking_unwrap_in_core() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for file in source_files(&root.join("crates/turncache-core/src")) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (n, line) in production_lines(&content) {
            let trimmed = line.trim();
            if trimmed.starts_with("//") {
                continue;
            }
            if trimmed.contains(".unwrap()") || trimmed.contains(".expect(") {
                violations.push((rel(&file, &root), n, trimmed.to_string()));
            }
        }
    }

    report(
        "ERR-03",
        "unwrap()/expect() in library code. Propagate a CacheError instead.",
        &violations,
    );
}

#[test]
fn test_file_size_limits() {
    const MAX_LINES: usize = 500;
    let root = workspace_root();
    let mut violations = Vec::new();

    for file in source_files(&root.join("crates")) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let lines = content.lines().count();
        if lines > MAX_LINES {
            violations.push((rel(&file, &root), lines, format!("{lines} lines")));
        }
    }

    report(
        "SIZE-01",
        "Source file over the line limit. Split it into submodules.",
        &violations,
    );
}

/// Crate names listed under `[dependencies]` in a manifest, as used in code.
fn declared_dependencies(manifest: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let mut in_deps = false;
    for line in manifest.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            in_deps = trimmed == "[dependencies]";
            continue;
        }
        if !in_deps || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((name, _)) = trimmed.split_once('=') {
            deps.push(name.trim().replace('-', "_"));
        }
    }
    deps
}

#[test]
fn test_declared_dependencies_are_used() {
    let root = workspace_root();
    let mut violations = Vec::new();

    for krate in ["turncache-core", "turncache-cli"] {
        let dir = root.join("crates").join(krate);
        let manifest = fs::read_to_string(dir.join("Cargo.toml")).unwrap_or_default();
        let sources: String = walkdir(&dir.join("src"))
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "rs"))
            .filter_map(|p| fs::read_to_string(p).ok())
            .collect();

        for dep in declared_dependencies(&manifest) {
            let path_use = format!("{dep}::");
            let serde_with = format!("\"{dep}\"");
            if !sources.contains(&path_use) && !sources.contains(&serde_with) {
                violations.push((format!("crates/{krate}/Cargo.toml"), 0, dep));
            }
        }
    }

    report(
        "DEP-01",
        "Dependency declared but never referenced. Remove it from the manifest.",
        &violations,
    );
}

#[test]
fn test_declared_dependencies_parsing() {
    let manifest = "[package]\nname = \"x\"\n\n[dependencies]\n# Logging\ntracing-subscriber = { workspace = true }\nserde = \"1\"\n\n[dev-dependencies]\ntempfile = \"3\"\n";
    assert_eq!(declared_dependencies(manifest), vec!["tracing_subscriber", "serde"]);
}
