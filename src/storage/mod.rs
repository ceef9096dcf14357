//! Storage module for harvest progress and run history
//!
//! This module handles:
//! - the progress store: per tracked source, the highest sequence number
//!   already indexed (a TOML sources file)
//! - the run journal: SQLite record of runs and of every per-item or
//!   per-source failure, for postmortem and `--stats`

mod journal;
mod schema;
mod sources;

pub use journal::Journal;
pub use sources::SourcesFile;

use crate::StoreResult;
use serde::{Deserialize, Serialize};

/// A remote list being harvested, with how far it has been indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackedSource {
    /// Key of the source's table in the sources file
    #[serde(skip)]
    pub key: String,
    pub title: String,
    pub url: String,
    /// Highest sequence number already indexed; never decreases
    #[serde(default)]
    pub current_number: u32,
    /// Search index the source's records are published to
    pub index_id: String,
    /// Replaces the item number as record id prefix when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_prefix: Option<String>,
}

/// Persistence of tracked sources between runs
pub trait ProgressStore {
    /// Reads every tracked source, in a stable order
    fn read_tracked_sources(&self) -> StoreResult<Vec<TrackedSource>>;

    /// Replaces the stored sources with `sources`
    fn write_tracked_sources(&self, sources: &[TrackedSource]) -> StoreResult<()>;
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub mode: RunMode,
    pub config_hash: String,
    pub status: RunStatus,
}

/// What a run was started to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    UpdateDocuments,
    UpdateSettings,
    DryRun,
}

impl RunMode {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::UpdateDocuments => "update-documents",
            Self::UpdateSettings => "update-settings",
            Self::DryRun => "dry-run",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "update-documents" => Some(Self::UpdateDocuments),
            "update-settings" => Some(Self::UpdateSettings),
            "dry-run" => Some(Self::DryRun),
            _ => None,
        }
    }
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Where in the run a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// The list walk for a source failed; nothing from it was indexed
    Walk,
    /// An item's detail page never became ready
    Detail,
    /// Submitting records failed in transport or was rejected outright
    Submission,
    /// The index service accepted the submission but its task failed
    Task,
    /// Pushing index settings failed
    Settings,
}

impl FailureKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Detail => "detail",
            Self::Submission => "submission",
            Self::Task => "task",
            Self::Settings => "settings",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "walk" => Some(Self::Walk),
            "detail" => Some(Self::Detail),
            "submission" => Some(Self::Submission),
            "task" => Some(Self::Task),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// A failure written to the journal
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub source_key: String,
    pub item_number: Option<String>,
    pub item_link: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    /// The records that were being submitted, as JSON
    pub records_json: Option<String>,
}
