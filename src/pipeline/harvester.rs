//! Harvest orchestration
//!
//! For every tracked source, in order: walk its list for new items, then
//! for every new item, one at a time, load the detail page, extract its
//! records, submit them and wait for the index to finish the task. A
//! failing item is logged and journaled and the run moves on; progress for
//! a source advances only once every one of its items has been attempted.

use crate::automation::Browser;
use crate::config::{Config, ItemFailurePolicy};
use crate::index::{IndexService, IndexSettings, TaskOutcome};
use crate::pipeline::{RunReport, SettingsReport, SourceReport};
use crate::record::{extract_records, fetch_detail, ExtractOptions, ListItem, Record};
use crate::storage::{FailureKind, FailureRecord, Journal, ProgressStore, TrackedSource};
use crate::walker::ListWalker;
use crate::{HarvestError, IndexResult};
use futures::future::join_all;
use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where extracted records go
#[derive(Clone, Copy)]
enum Publish<'a> {
    /// Submit to the index and wait for each task
    Submit(&'a dyn IndexService),
    /// Only log what would be submitted
    Preview,
}

enum ItemOutcome {
    Indexed(usize),
    Empty,
    Failed,
}

struct RunJournal {
    journal: Arc<Mutex<Journal>>,
    run_id: i64,
}

/// Drives tracked sources through walking, extraction and indexing
pub struct Harvester {
    config: Arc<Config>,
    browser: Box<dyn Browser>,
    index: Option<Box<dyn IndexService>>,
    journal: Option<RunJournal>,
}

impl Harvester {
    pub fn new(config: Arc<Config>, browser: Box<dyn Browser>) -> Self {
        Self {
            config,
            browser,
            index: None,
            journal: None,
        }
    }

    /// Publishes records to `index`; required by every mode but previews
    pub fn with_index(mut self, index: Box<dyn IndexService>) -> Self {
        self.index = Some(index);
        self
    }

    /// Records every failure of this run under `run_id`
    pub fn with_journal(mut self, journal: Arc<Mutex<Journal>>, run_id: i64) -> Self {
        self.journal = Some(RunJournal { journal, run_id });
        self
    }

    fn index(&self) -> crate::Result<&dyn IndexService> {
        self.index.as_deref().ok_or(HarvestError::NoIndexService)
    }

    fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.config.walker.wait_timeout_ms)
    }

    /// Indexes every new item of every tracked source and persists the
    /// advanced progress
    ///
    /// A source whose walk fails, or that is aborted under the `abort`
    /// item policy, keeps its previous progress; the other sources are
    /// still processed. The progress store is written once, after all
    /// sources.
    pub async fn update_documents(&self, store: &dyn ProgressStore) -> crate::Result<RunReport> {
        let index = self.index()?;
        let sources = store.read_tracked_sources()?;
        let (updated, report) = self.harvest_all(&sources, Publish::Submit(index)).await;
        store.write_tracked_sources(&updated)?;
        Ok(report)
    }

    /// Walks and extracts like [`Self::update_documents`] without
    /// submitting anything or touching the progress store
    pub async fn preview(&self, store: &dyn ProgressStore) -> crate::Result<RunReport> {
        let sources = store.read_tracked_sources()?;
        let (_, report) = self.harvest_all(&sources, Publish::Preview).await;
        Ok(report)
    }

    async fn harvest_all(
        &self,
        sources: &[TrackedSource],
        publish: Publish<'_>,
    ) -> (Vec<TrackedSource>, RunReport) {
        let mut updated = Vec::with_capacity(sources.len());
        let mut report = RunReport::default();

        for source in sources {
            tracing::info!("Harvesting '{}' from {}", source.title, source.url);
            match self.harvest_source(source, publish).await {
                Ok((advanced, source_report)) => {
                    tracing::info!(
                        "'{}': {} new items, {} indexed, {} empty, {} failed; now at {}",
                        source.title,
                        source_report.items_found,
                        source_report.items_indexed,
                        source_report.items_empty,
                        source_report.items_failed,
                        advanced.current_number
                    );
                    updated.push(advanced);
                    report.sources.push(source_report);
                }
                Err(e) => {
                    tracing::error!("Harvesting '{}' failed, progress kept at {}: {}", source.title, source.current_number, e);
                    if let HarvestError::Walk { .. } = e {
                        self.record_failure(source, None, FailureKind::Walk, &e, None);
                    }
                    updated.push(source.clone());
                    report.failed_sources.push(source.key.clone());
                }
            }
        }

        (updated, report)
    }

    async fn harvest_source(
        &self,
        source: &TrackedSource,
        publish: Publish<'_>,
    ) -> crate::Result<(TrackedSource, SourceReport)> {
        let mut walker = ListWalker::new(self.browser.as_ref(), &self.config);
        let outcome = walker.walk(source).await?;

        let mut report = SourceReport {
            key: source.key.clone(),
            title: source.title.clone(),
            previous_number: source.current_number,
            current_number: outcome.source.current_number,
            descending: outcome.descending,
            items_found: outcome.items.len(),
            ..SourceReport::default()
        };

        let total = outcome.items.len();
        for (done, item) in outcome.items.iter().enumerate() {
            match self.process_item(source, item, publish).await? {
                ItemOutcome::Indexed(records) => {
                    report.items_indexed += 1;
                    report.records += records;
                }
                ItemOutcome::Empty => report.items_empty += 1,
                ItemOutcome::Failed => report.items_failed += 1,
            }
            tracing::info!(
                "{} progress: {:.2}%",
                source.title,
                (done + 1) as f64 / total as f64 * 100.0
            );
        }

        Ok((outcome.source, report))
    }

    async fn process_item(
        &self,
        source: &TrackedSource,
        item: &ListItem,
        publish: Publish<'_>,
    ) -> crate::Result<ItemOutcome> {
        let markup = match fetch_detail(
            self.browser.as_ref(),
            item,
            &self.config.selectors,
            self.wait_timeout(),
        )
        .await
        {
            Ok(markup) => markup,
            Err(e) => {
                self.record_failure(source, Some(item), FailureKind::Detail, &e, None);
                return match self.config.walker.on_item_failure {
                    ItemFailurePolicy::Skip => {
                        tracing::warn!("Skipping item {} of '{}': {}", item.number_str, source.title, e);
                        Ok(ItemOutcome::Failed)
                    }
                    ItemFailurePolicy::Abort => Err(e),
                };
            }
        };

        let options = ExtractOptions {
            selectors: &self.config.selectors,
            extractor: &self.config.extractor,
            id_prefix: source.id_prefix.as_deref(),
        };
        let records = extract_records(&markup, item, &options);
        if records.is_empty() {
            tracing::debug!("Item {} ({}) has no records", item.number_str, item.link);
            return Ok(ItemOutcome::Empty);
        }

        let index = match publish {
            Publish::Submit(index) => index,
            Publish::Preview => {
                for record in &records {
                    tracing::info!("[dry-run] {} -> {} {} ({})", source.index_id, record.id, record.title, record.url);
                }
                return Ok(ItemOutcome::Indexed(records.len()));
            }
        };

        match submit_and_wait(index, &source.index_id, &records).await {
            Ok(outcome) if outcome.succeeded() => Ok(ItemOutcome::Indexed(records.len())),
            Ok(outcome) => {
                let message = match &outcome.error {
                    Some(error) => error.to_string(),
                    None => format!("task ended as {:?}", outcome.status),
                };
                tracing::warn!(
                    "Index task {} for item {} of '{}' did not succeed: {}",
                    outcome.task_uid,
                    item.number_str,
                    source.title,
                    message
                );
                self.record_failure(source, Some(item), FailureKind::Task, &message, Some(&records));
                Ok(ItemOutcome::Failed)
            }
            Err(e) => {
                tracing::error!("Submitting item {} of '{}' failed: {}", item.number_str, source.title, e);
                tracing::error!("Item: {:?}", item);
                tracing::error!("Records: {:?}", records);
                self.record_failure(source, Some(item), FailureKind::Submission, &e, Some(&records));
                Ok(ItemOutcome::Failed)
            }
        }
    }

    /// Pushes the configured index settings to every tracked source's index
    ///
    /// All sources are configured concurrently; a failure for one index is
    /// logged and reported without affecting the others.
    pub async fn update_settings(&self, store: &dyn ProgressStore) -> crate::Result<SettingsReport> {
        let index = self.index()?;
        let sources = store.read_tracked_sources()?;
        let settings = IndexSettings::from(&self.config.index);

        let results = join_all(
            sources
                .iter()
                .map(|source| apply_settings(index, &source.index_id, &settings)),
        )
        .await;

        let mut report = SettingsReport::default();
        for (source, result) in sources.iter().zip(results) {
            let failure = match result {
                Ok(outcome) if outcome.succeeded() => {
                    tracing::info!("Updated settings of index '{}'", source.index_id);
                    report.configured.push(source.index_id.clone());
                    continue;
                }
                Ok(outcome) => {
                    let message = match &outcome.error {
                        Some(error) => error.to_string(),
                        None => format!("task ended as {:?}", outcome.status),
                    };
                    tracing::warn!("Settings task for index '{}' did not succeed: {}", source.index_id, message);
                    message
                }
                Err(e) => {
                    tracing::error!("Updating settings of index '{}' failed: {}", source.index_id, e);
                    e.to_string()
                }
            };
            self.record_failure(source, None, FailureKind::Settings, &failure, None);
            report.failed.push((source.index_id.clone(), failure));
        }

        Ok(report)
    }

    fn record_failure(
        &self,
        source: &TrackedSource,
        item: Option<&ListItem>,
        kind: FailureKind,
        message: &dyn Display,
        records: Option<&[Record]>,
    ) {
        let Some(run) = &self.journal else {
            return;
        };

        let failure = FailureRecord {
            source_key: source.key.clone(),
            item_number: item.map(|i| i.number_str.clone()),
            item_link: item.map(|i| i.link.clone()),
            kind,
            message: message.to_string(),
            records_json: records.and_then(|r| serde_json::to_string(r).ok()),
        };

        let journal = run.journal.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = journal.record_failure(run.run_id, &failure) {
            tracing::warn!("Failed to journal {} failure: {}", kind.to_db_string(), e);
        }
    }
}

async fn submit_and_wait(
    index: &dyn IndexService,
    index_id: &str,
    records: &[Record],
) -> IndexResult<TaskOutcome> {
    let handle = index.submit_documents(index_id, records).await?;
    index.await_task(handle).await
}

async fn apply_settings(
    index: &dyn IndexService,
    index_id: &str,
    settings: &IndexSettings,
) -> IndexResult<TaskOutcome> {
    let handle = index.configure_index(index_id, settings).await?;
    index.await_task(handle).await
}
