//! Tidemark main entry point
//!
//! This is the command-line interface for the Tidemark list harvester.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tidemark::automation::{Browser, ChromiumBrowser, HttpBrowser};
use tidemark::config::{load_config_with_hash, Config, DriverEngine, IndexCredentials};
use tidemark::index::MeiliClient;
use tidemark::output::{load_statistics, print_run_report, print_settings_report, print_statistics};
use tidemark::pipeline::{Harvester, RunReport, SettingsReport};
use tidemark::storage::{Journal, RunMode, RunStatus, SourcesFile};
use tracing_subscriber::EnvFilter;

/// Tidemark: an incremental list harvester
///
/// Tidemark walks lazily loaded lists for entries newer than the last run,
/// extracts records from each new entry's page and publishes them to a
/// Meilisearch index. Index credentials are read from MEILI_HOST and
/// MEILI_API_KEY.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version = "1.0.0")]
#[command(about = "An incremental list harvester", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["update_documents", "update_settings", "dry_run", "stats"])))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Index every new item of every tracked source and save progress
    #[arg(long)]
    update_documents: bool,

    /// Push attribute and ranking settings to every tracked source's index
    #[arg(long)]
    update_settings: bool,

    /// Walk and extract without submitting anything or saving progress
    #[arg(long)]
    dry_run: bool,

    /// Show run history from the journal and exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    let paths = StoragePaths::resolve(&cli.config, &config);

    if cli.stats {
        return handle_stats(&paths);
    }

    let mode = if cli.update_documents {
        RunMode::UpdateDocuments
    } else if cli.update_settings {
        RunMode::UpdateSettings
    } else {
        RunMode::DryRun
    };

    handle_run(Arc::new(config), &config_hash, &paths, mode).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Store locations, relative paths taken from the config file's directory
struct StoragePaths {
    sources: PathBuf,
    journal: PathBuf,
}

impl StoragePaths {
    fn resolve(config_path: &Path, config: &Config) -> Self {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Self {
            sources: base.join(&config.storage.sources_path),
            journal: base.join(&config.storage.journal_path),
        }
    }
}

/// Handles the --stats mode: shows run history from the journal
fn handle_stats(paths: &StoragePaths) -> anyhow::Result<()> {
    println!("Journal: {}\n", paths.journal.display());

    let journal = Journal::open(&paths.journal)
        .with_context(|| format!("opening journal {}", paths.journal.display()))?;
    let stats = load_statistics(&journal)?;
    print_statistics(&stats);

    Ok(())
}

/// Page driver chosen by the `[driver]` config section
enum Driver {
    Http(HttpBrowser),
    Chromium(Arc<ChromiumBrowser>),
}

impl Driver {
    async fn start(config: &Config) -> anyhow::Result<Self> {
        match config.driver.engine {
            DriverEngine::Http => {
                tracing::info!("Using the static HTTP page driver");
                Ok(Driver::Http(HttpBrowser::from_config(&config.user_agent)?))
            }
            DriverEngine::Chromium => {
                let browser = ChromiumBrowser::launch(&config.driver, &config.user_agent)
                    .await
                    .context("launching Chromium (set [driver] engine = \"http\" for static pages)")?;
                Ok(Driver::Chromium(Arc::new(browser)))
            }
        }
    }

    fn browser(&self) -> Box<dyn Browser> {
        match self {
            Driver::Http(browser) => Box::new(browser.clone()),
            Driver::Chromium(browser) => Box::new(browser.clone()),
        }
    }

    async fn shutdown(self) {
        if let Driver::Chromium(browser) = self {
            match Arc::try_unwrap(browser) {
                Ok(browser) => {
                    if let Err(e) = browser.shutdown().await {
                        tracing::warn!("Failed to shut down Chromium: {}", e);
                    }
                }
                Err(_) => tracing::warn!("Chromium still in use; leaving it to exit with the process"),
            }
        }
    }
}

/// What a journaled run produced
enum Outcome {
    Harvest(RunReport),
    Settings(SettingsReport),
}

impl Outcome {
    /// Sources that failed as a whole
    ///
    /// Settings that an index rejects are per-index degradations, already
    /// logged and journaled; they never fail the run.
    fn failed_sources(&self) -> &[String] {
        match self {
            Outcome::Harvest(report) => &report.failed_sources,
            Outcome::Settings(_) => &[],
        }
    }

    fn print(&self, mode: RunMode) {
        match self {
            Outcome::Harvest(report) => print_run_report(report, mode == RunMode::DryRun),
            Outcome::Settings(report) => {
                print_settings_report(report);
                if !report.all_configured() {
                    tracing::warn!(
                        "{} of {} indexes did not accept their settings",
                        report.failed.len(),
                        report.failed.len() + report.configured.len()
                    );
                }
            }
        }
    }
}

/// Handles the three harvesting modes, journaling the run
async fn handle_run(
    config: Arc<Config>,
    config_hash: &str,
    paths: &StoragePaths,
    mode: RunMode,
) -> anyhow::Result<()> {
    let index = if mode == RunMode::DryRun {
        None
    } else {
        let credentials = IndexCredentials::from_env()?;
        tracing::info!("Publishing to index service at {}", credentials.host);
        Some(MeiliClient::new(&credentials, &config.index)?)
    };

    let journal = Journal::open(&paths.journal)
        .with_context(|| format!("opening journal {}", paths.journal.display()))?;

    let driver = Driver::start(&config).await?;
    let mut harvester = Harvester::new(config.clone(), driver.browser());
    if let Some(index) = index {
        harvester = harvester.with_index(Box::new(index));
    }

    let run_id = match journal.create_run(mode, config_hash) {
        Ok(run_id) => run_id,
        Err(e) => {
            drop(harvester);
            driver.shutdown().await;
            return Err(e.into());
        }
    };
    let journal = Arc::new(Mutex::new(journal));
    let harvester = harvester.with_journal(journal.clone(), run_id);
    tracing::info!("Started {} run {}", mode.to_db_string(), run_id);

    let store = SourcesFile::new(&paths.sources);
    let outcome = match mode {
        RunMode::UpdateDocuments => harvester.update_documents(&store).await.map(Outcome::Harvest),
        RunMode::DryRun => harvester.preview(&store).await.map(Outcome::Harvest),
        RunMode::UpdateSettings => harvester.update_settings(&store).await.map(Outcome::Settings),
    };
    drop(harvester);
    driver.shutdown().await;

    let status = match &outcome {
        Ok(outcome) if outcome.failed_sources().is_empty() => RunStatus::Completed,
        _ => RunStatus::Failed,
    };
    {
        let journal = journal.lock().unwrap_or_else(|e| e.into_inner());
        journal.finish_run(run_id, status)?;
    }

    match outcome {
        Ok(outcome) => {
            outcome.print(mode);
            let failed = outcome.failed_sources();
            if failed.is_empty() {
                tracing::info!("Run {} completed", run_id);
                Ok(())
            } else {
                anyhow::bail!("run {} finished with {} failed sources", run_id, failed.len())
            }
        }
        Err(e) => {
            tracing::error!("Run {} failed: {}", run_id, e);
            Err(e.into())
        }
    }
}
