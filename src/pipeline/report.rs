//! Outcome summaries of harvest runs

/// What happened to one tracked source during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub key: String,
    pub title: String,
    /// `current_number` before the run
    pub previous_number: u32,
    /// `current_number` after the run
    pub current_number: u32,
    /// Whether the list was walked newest-first
    pub descending: bool,
    /// New items the walk revealed
    pub items_found: usize,
    /// Items whose records made it into the index
    pub items_indexed: usize,
    /// Items that produced no records
    pub items_empty: usize,
    /// Items that failed at any stage
    pub items_failed: usize,
    /// Records extracted (and submitted, unless previewing)
    pub records: usize,
}

impl SourceReport {
    pub fn items_attempted(&self) -> usize {
        self.items_indexed + self.items_empty + self.items_failed
    }
}

/// Summary of an update-documents or dry run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    /// Keys of sources that failed as a whole and kept their progress
    pub failed_sources: Vec<String>,
}

impl RunReport {
    pub fn total_items(&self) -> usize {
        self.sources.iter().map(|s| s.items_found).sum()
    }

    pub fn total_records(&self) -> usize {
        self.sources.iter().map(|s| s.records).sum()
    }

    pub fn total_item_failures(&self) -> usize {
        self.sources.iter().map(|s| s.items_failed).sum()
    }

    /// True when no source failed as a whole; item failures do not count
    pub fn is_success(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

/// Summary of an update-settings run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsReport {
    /// Index ids whose settings task succeeded
    pub configured: Vec<String>,
    /// Index ids whose settings could not be applied, with the reason
    pub failed: Vec<(String, String)>,
}

impl SettingsReport {
    /// True when every index accepted its settings
    pub fn all_configured(&self) -> bool {
        self.failed.is_empty()
    }
}
