//! Statistics from the run journal
//!
//! This module extracts run history and failure counts from the journal
//! for the `--stats` mode.

use crate::storage::{FailureKind, Journal, RunRecord};
use crate::StoreResult;
use std::collections::BTreeMap;
use std::fmt::Write;

/// How many runs `--stats` lists
pub const RECENT_RUNS: u32 = 10;

/// Journal statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of runs ever journaled
    pub total_runs: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,

    /// Failure counts of the latest run, by kind
    pub latest_failures: BTreeMap<FailureKind, u64>,

    /// Failure counts over all runs, by source key
    pub failures_by_source: BTreeMap<String, u64>,
}

/// Loads statistics from the journal
pub fn load_statistics(journal: &Journal) -> StoreResult<HarvestStatistics> {
    let total_runs = journal.count_runs()?;
    let recent_runs = journal.recent_runs(RECENT_RUNS)?;

    let latest_failures = match recent_runs.first() {
        Some(run) => journal.failure_summary(run.id)?,
        None => BTreeMap::new(),
    };

    let failures_by_source = journal.failures_by_source()?;

    Ok(HarvestStatistics {
        total_runs,
        recent_runs,
        latest_failures,
        failures_by_source,
    })
}

/// Seconds between a run's start and finish, if it finished
pub fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<chrono::DateTime<chrono::Utc>>().ok()?;
    let finished = run
        .finished_at
        .as_deref()?
        .parse::<chrono::DateTime<chrono::Utc>>()
        .ok()?;
    Some((finished - started).num_seconds())
}

/// Formats statistics for display
pub fn format_statistics(stats: &HarvestStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Harvest Statistics ===\n");
    let _ = writeln!(out, "Total runs: {}\n", stats.total_runs);

    if stats.recent_runs.is_empty() {
        let _ = writeln!(out, "No runs recorded yet.");
        return out;
    }

    let _ = writeln!(out, "Recent runs:");
    for run in &stats.recent_runs {
        let duration = match run_duration_seconds(run) {
            Some(seconds) => format!("{}s", seconds),
            None => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "  #{} {} {} [{}] {} (config {})",
            run.id,
            run.started_at,
            run.mode.to_db_string(),
            run.status.to_db_string(),
            duration,
            &run.config_hash[..run.config_hash.len().min(12)]
        );
    }
    let _ = writeln!(out);

    if stats.latest_failures.is_empty() {
        let _ = writeln!(out, "Latest run had no failures.");
    } else {
        let _ = writeln!(out, "Latest run failures:");
        for (kind, count) in &stats.latest_failures {
            let _ = writeln!(out, "  {}: {}", kind.to_db_string(), count);
        }
    }

    if !stats.failures_by_source.is_empty() {
        let _ = writeln!(out, "\nFailures by source (all runs):");
        let mut counts: Vec<_> = stats.failures_by_source.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (source, count) in counts {
            let _ = writeln!(out, "  {}: {}", source, count);
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &HarvestStatistics) {
    print!("{}", format_statistics(stats));
}
