//! SQLite run journal
//!
//! Every run gets a row in `runs`; every failure the run tolerated (or died
//! of) gets a row in `failures` carrying the item and the records involved.

use crate::storage::schema::initialize_schema;
use crate::storage::{FailureKind, FailureRecord, RunMode, RunRecord, RunStatus};
use crate::StoreResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

/// Journal of harvest runs and their failures
pub struct Journal {
    conn: Connection,
}

impl Journal {
    /// Opens or creates the journal database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory journal
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    // ===== Run Management =====

    /// Starts a new run and returns its id
    pub fn create_run(&self, mode: RunMode, config_hash: &str) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, mode, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                mode.to_db_string(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Marks a run finished with `status`
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    pub fn get_latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, mode, config_hash, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Most recent runs first, at most `limit`
    pub fn recent_runs(&self, limit: u32) -> StoreResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, mode, config_hash, status
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let runs = stmt
            .query_map(params![limit], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    pub fn count_runs(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Failures =====

    pub fn record_failure(&self, run_id: i64, failure: &FailureRecord) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO failures
             (run_id, source_key, item_number, item_link, kind, message, records_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                failure.source_key,
                failure.item_number,
                failure.item_link,
                failure.kind.to_db_string(),
                failure.message,
                failure.records_json,
                now
            ],
        )?;
        Ok(())
    }

    pub fn failures_for_run(&self, run_id: i64) -> StoreResult<Vec<FailureRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_key, item_number, item_link, kind, message, records_json
             FROM failures WHERE run_id = ?1 ORDER BY id",
        )?;
        let failures = stmt
            .query_map(params![run_id], |row| {
                Ok(FailureRecord {
                    source_key: row.get(0)?,
                    item_number: row.get(1)?,
                    item_link: row.get(2)?,
                    kind: FailureKind::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(FailureKind::Submission),
                    message: row.get(4)?,
                    records_json: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(failures)
    }

    /// Failure counts of one run, by kind
    pub fn failure_summary(&self, run_id: i64) -> StoreResult<BTreeMap<FailureKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM failures WHERE run_id = ?1 GROUP BY kind",
        )?;

        let mut summary = BTreeMap::new();
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = FailureKind::from_db_string(&kind) {
                summary.insert(kind, count as u64);
            }
        }
        Ok(summary)
    }

    /// Failure counts over all runs, by source key
    pub fn failures_by_source(&self) -> StoreResult<BTreeMap<String, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source_key, COUNT(*) FROM failures GROUP BY source_key")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        mode: RunMode::from_db_string(&row.get::<_, String>(3)?).unwrap_or(RunMode::UpdateDocuments),
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Running),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(source_key: &str, kind: FailureKind) -> FailureRecord {
        FailureRecord {
            source_key: source_key.to_string(),
            item_number: Some("7".to_string()),
            item_link: Some("https://mp.example.com/s/issue-7".to_string()),
            kind,
            message: "boom".to_string(),
            records_json: Some("[]".to_string()),
        }
    }

    #[test]
    fn test_create_and_finish_run() {
        let journal = Journal::in_memory().unwrap();
        let run_id = journal.create_run(RunMode::UpdateDocuments, "abc123").unwrap();

        let run = journal.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.mode, RunMode::UpdateDocuments);
        assert!(run.finished_at.is_none());

        journal.finish_run(run_id, RunStatus::Completed).unwrap();
        let run = journal.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_empty_journal_has_no_latest_run() {
        let journal = Journal::in_memory().unwrap();
        assert!(journal.get_latest_run().unwrap().is_none());
        assert_eq!(journal.count_runs().unwrap(), 0);
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let journal = Journal::in_memory().unwrap();
        let first = journal.create_run(RunMode::DryRun, "h").unwrap();
        let second = journal.create_run(RunMode::UpdateSettings, "h").unwrap();

        let runs = journal.recent_runs(10).unwrap();
        assert_eq!(runs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(journal.recent_runs(1).unwrap().len(), 1);
    }

    #[test]
    fn test_failures_are_kept_per_run() {
        let journal = Journal::in_memory().unwrap();
        let run_a = journal.create_run(RunMode::UpdateDocuments, "h").unwrap();
        let run_b = journal.create_run(RunMode::UpdateDocuments, "h").unwrap();

        journal.record_failure(run_a, &failure("weekly", FailureKind::Task)).unwrap();
        journal.record_failure(run_a, &failure("weekly", FailureKind::Detail)).unwrap();
        journal.record_failure(run_a, &failure("digest", FailureKind::Task)).unwrap();
        journal.record_failure(run_b, &failure("digest", FailureKind::Walk)).unwrap();

        let failures = journal.failures_for_run(run_a).unwrap();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0], failure("weekly", FailureKind::Task));

        let summary = journal.failure_summary(run_a).unwrap();
        assert_eq!(summary.get(&FailureKind::Task), Some(&2));
        assert_eq!(summary.get(&FailureKind::Detail), Some(&1));
        assert_eq!(summary.get(&FailureKind::Walk), None);

        let by_source = journal.failures_by_source().unwrap();
        assert_eq!(by_source.get("weekly"), Some(&2));
        assert_eq!(by_source.get("digest"), Some(&2));
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        let run_id = {
            let journal = Journal::open(&path).unwrap();
            journal.create_run(RunMode::UpdateDocuments, "h").unwrap()
        };

        let journal = Journal::open(&path).unwrap();
        assert_eq!(journal.get_latest_run().unwrap().unwrap().id, run_id);
    }
}
