//! Configuration module for Tidemark
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and reading the index service credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use tidemark::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tidemark.toml")).unwrap();
//! println!("Windows are {} items wide", config.walker.window_step);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, DriverConfig, DriverEngine, ExtractorConfig, IndexConfig, IndexCredentials,
    ItemFailurePolicy, SelectorConfig, StorageConfig, UserAgentConfig, WalkerConfig,
    DEFAULT_REORDER_THRESHOLD,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
