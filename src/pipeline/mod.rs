//! Indexing pipeline
//!
//! `Harvester` ties the walker, the record extractor, the index service and
//! the progress store together; the report types summarize what a run did.

mod harvester;
mod report;

pub use harvester::Harvester;
pub use report::{RunReport, SettingsReport, SourceReport};
