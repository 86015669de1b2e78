//! Checks run before the appliance loop starts.
//!
//! A failed check stops `run` with a hint; `--skip-preflight` bypasses them.

mod mpv;

use crate::models::config::Config;
use crate::services::volume::has_marker;
use colored::Colorize;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Passed,
    Failed { hint: String },
}

/// A named check and what it found.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub detail: String,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn passed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            detail: detail.into(),
            status: CheckStatus::Passed,
        }
    }

    pub fn failed(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            detail: detail.into(),
            status: CheckStatus::Failed { hint: hint.into() },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == CheckStatus::Passed
    }
}

/// Run every check that applies to the configuration.
pub fn run_preflight_checks(config: &Config) -> Vec<CheckResult> {
    let mut results = vec![mpv::check(&config.playback.mpv_path)];
    if let Some(root) = &config.volume.media_root {
        results.push(check_media_root(root, &config.volume.marker));
    }
    results
}

/// A pinned media root must already carry the marker; otherwise the loop
/// would wait forever.
fn check_media_root(root: &std::path::Path, marker: &str) -> CheckResult {
    if has_marker(root, marker) {
        CheckResult::passed("media root", root.display().to_string())
    } else {
        CheckResult::failed(
            "media root",
            format!("no '{}' entry in {}", marker, root.display()),
            "Attach the drive or drop --media-root to search mounted drives",
        )
    }
}

pub fn print_results(results: &[CheckResult]) {
    for result in results {
        match &result.status {
            CheckStatus::Passed => {
                println!("{} {}: {}", "[OK]".green(), result.name.bold(), result.detail)
            }
            CheckStatus::Failed { hint } => {
                println!("{} {}: {}", "[FAIL]".red(), result.name.bold(), result.detail);
                println!("  {} {}", "->".yellow(), hint);
            }
        }
    }
}

pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(CheckResult::is_ok)
}
