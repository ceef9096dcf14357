//! Output module for run summaries and journal statistics
//!
//! This module handles:
//! - printing what a harvest, dry run or settings refresh did
//! - extracting and printing run history from the journal (`--stats`)

pub mod stats;
mod summary;

pub use stats::{format_statistics, load_statistics, print_statistics, HarvestStatistics};
pub use summary::{
    format_run_report, format_settings_report, print_run_report, print_settings_report,
};
