//! Index service interface and task types

use crate::config::IndexConfig;
use crate::record::Record;
use crate::IndexResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Handle to an asynchronous task queued by the index service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHandle {
    #[serde(alias = "uid")]
    pub task_uid: u64,
}

/// Lifecycle status of an index task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Returns true once the task will not change status again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Error reported by the index service for a failed task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Final state of an index task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskOutcome {
    #[serde(rename = "uid")]
    pub task_uid: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<TaskError>,
}

impl TaskOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }
}

/// Attribute and ranking settings pushed to every tracked source's index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub displayed_attributes: Vec<String>,
    pub searchable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    pub ranking_rules: Vec<String>,
}

impl From<&IndexConfig> for IndexSettings {
    fn from(config: &IndexConfig) -> Self {
        Self {
            displayed_attributes: config.displayed_attributes.clone(),
            searchable_attributes: config.searchable_attributes.clone(),
            sortable_attributes: config.sortable_attributes.clone(),
            ranking_rules: config.ranking_rules.clone(),
        }
    }
}

/// A search index service accepting record batches as asynchronous tasks
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Queues `records` for upsert into `index_id`, keyed by record id
    async fn submit_documents(&self, index_id: &str, records: &[Record]) -> IndexResult<TaskHandle>;

    /// Blocks until the task reaches a terminal status
    ///
    /// A task that does not finish in time is an [`crate::IndexError::TaskTimeout`].
    async fn await_task(&self, handle: TaskHandle) -> IndexResult<TaskOutcome>;

    /// Queues a settings update for `index_id`
    async fn configure_index(&self, index_id: &str, settings: &IndexSettings) -> IndexResult<TaskHandle>;
}
