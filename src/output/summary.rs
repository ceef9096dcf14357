//! End-of-run summaries printed by the CLI

use crate::pipeline::{RunReport, SettingsReport};
use std::fmt::Write;

/// Formats what an update-documents or dry run did, one line per source
pub fn format_run_report(report: &RunReport, dry_run: bool) -> String {
    let mut out = String::new();
    let heading = if dry_run { "Dry Run" } else { "Harvest" };
    let _ = writeln!(out, "=== {} Summary ===\n", heading);

    for source in &report.sources {
        let _ = writeln!(
            out,
            "  {}: {} -> {} ({} new, {} indexed, {} empty, {} failed, {} records)",
            source.title,
            source.previous_number,
            source.current_number,
            source.items_found,
            source.items_indexed,
            source.items_empty,
            source.items_failed,
            source.records
        );
    }

    for key in &report.failed_sources {
        let _ = writeln!(out, "  {}: FAILED, progress unchanged", key);
    }

    let _ = writeln!(
        out,
        "\nTotal: {} new items, {} records, {} item failures, {} failed sources",
        report.total_items(),
        report.total_records(),
        report.total_item_failures(),
        report.failed_sources.len()
    );
    out
}

pub fn print_run_report(report: &RunReport, dry_run: bool) {
    print!("{}", format_run_report(report, dry_run));
}

/// Formats the outcome of an update-settings run
pub fn format_settings_report(report: &SettingsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Index Settings ===\n");
    for index_id in &report.configured {
        let _ = writeln!(out, "  ✓ {}", index_id);
    }
    for (index_id, reason) in &report.failed {
        let _ = writeln!(out, "  ✗ {}: {}", index_id, reason);
    }
    out
}

pub fn print_settings_report(report: &SettingsReport) {
    print!("{}", format_settings_report(report));
}
