//! Tidemark: an incremental list harvester
//!
//! This crate walks a growing, lazily-loaded remote list in bounded windows,
//! extracts structured records from each new entry's detail page and
//! publishes them to a search index, remembering how far each source has
//! been processed so the next run only picks up new material.

pub mod automation;
pub mod config;
pub mod index;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod storage;
pub mod walker;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page automation error: {0}")]
    Driver(#[from] DriverError),

    #[error("Index service error: {0}")]
    Index(#[from] IndexError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Walk of source '{source_key}' failed: {source}")]
    Walk {
        source_key: String,
        #[source]
        source: DriverError,
    },

    #[error("Detail page {link} (item {number}) failed: {source}")]
    Item {
        number: String,
        link: String,
        #[source]
        source: DriverError,
    },

    #[error("No index service configured")]
    NoIndexService,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing required environment variable {0}")]
    MissingEnv(&'static str),
}

/// Errors raised by a page-automation backend
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {after:?} waiting for {waiting_for}")]
    Timeout { waiting_for: String, after: Duration },

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Browser engine error: {0}")]
    Engine(String),

    #[error("Page is closed")]
    Closed,
}

/// Errors raised while talking to the search index service
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index service returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Task {task_uid} did not finish within {after:?}")]
    TaskTimeout { task_uid: u64, after: Duration },

    #[error("Invalid index service URL: {0}")]
    Url(#[from] ::url::ParseError),
}

/// Errors raised by the progress store and the run journal
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse sources file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize sources file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: ::url::ParseError,
    },
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page automation operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Result type alias for index service operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Result type alias for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// Re-export commonly used types
pub use config::Config;
pub use record::{derive_id, ListItem, Record};
pub use storage::TrackedSource;
pub use walker::{Windows, WalkState};
