//! TOML-backed progress store
//!
//! The sources file holds one `[sources.<key>]` table per tracked source:
//!
//! ```toml
//! [sources.rust-weekly]
//! title = "Rust Weekly"
//! url = "https://mp.example.com/album?id=42"
//! current-number = 118
//! index-id = "rust-weekly"
//! ```
//!
//! Other top-level tables are carried through writes untouched.

use crate::storage::{ProgressStore, TrackedSource};
use crate::{StoreError, StoreResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SOURCES_TABLE: &str = "sources";

/// Progress store persisted as a TOML document
///
/// The document is read once and cached for the lifetime of the value;
/// writes replace the whole file and refresh the cache.
#[derive(Debug)]
pub struct SourcesFile {
    path: PathBuf,
    cache: Mutex<Option<toml::Table>>,
}

impl SourcesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn document(&self) -> StoreResult<toml::Table> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(document) = cache.as_ref() {
            return Ok(document.clone());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        let document: toml::Table = toml::from_str(&content)?;
        *cache = Some(document.clone());
        Ok(document)
    }
}

impl ProgressStore for SourcesFile {
    fn read_tracked_sources(&self) -> StoreResult<Vec<TrackedSource>> {
        let document = self.document()?;
        let table = match document.get(SOURCES_TABLE) {
            Some(value) => value.clone(),
            None => {
                tracing::warn!("No [{}] table in {}", SOURCES_TABLE, self.path.display());
                return Ok(Vec::new());
            }
        };

        let entries: BTreeMap<String, TrackedSource> = table.try_into()?;
        Ok(entries
            .into_iter()
            .map(|(key, source)| TrackedSource { key, ..source })
            .collect())
    }

    fn write_tracked_sources(&self, sources: &[TrackedSource]) -> StoreResult<()> {
        let mut document = match self.document() {
            Ok(document) => document,
            Err(StoreError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                toml::Table::new()
            }
            Err(e) => return Err(e),
        };

        let entries: BTreeMap<&str, &TrackedSource> = sources
            .iter()
            .map(|source| (source.key.as_str(), source))
            .collect();
        document.insert(SOURCES_TABLE.to_string(), toml::Value::try_from(entries)?);

        let content = toml::to_string_pretty(&document)?;
        let temp_path = self.path.with_extension("toml.tmp");
        fs::write(&temp_path, content).map_err(|e| self.io_error(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = Some(document);
        tracing::debug!("Wrote {} sources to {}", sources.len(), self.path.display());
        Ok(())
    }
}
