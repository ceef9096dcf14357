use serde::Deserialize;

/// Ratio of `current / newest` above which a list is walked newest-first
/// instead of being re-sorted chronologically.
pub const DEFAULT_REORDER_THRESHOLD: f64 = 0.5;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub walker: WalkerConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub index: IndexConfig,
    pub storage: StorageConfig,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Which page driver renders the lists and detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverEngine {
    /// Headless Chromium over the DevTools protocol
    #[default]
    Chromium,
    /// Plain HTTP GET; no scripts, no clicking or scrolling
    Http,
}

/// Page driver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub engine: DriverEngine,

    /// Chrome/Chromium binary; looked up on the system when unset
    #[serde(rename = "chrome-executable")]
    pub chrome_executable: Option<String>,

    pub headless: bool,

    /// How often a rendered page is asked whether its DOM changed (milliseconds)
    #[serde(rename = "mutation-poll-ms")]
    pub mutation_poll_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            engine: DriverEngine::Chromium,
            chrome_executable: None,
            headless: true,
            mutation_poll_ms: 100,
        }
    }
}

/// What to do when a detail page never becomes ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemFailurePolicy {
    /// Log the item and move on to the next one
    #[default]
    Skip,
    /// Fail the whole source, leaving its progress untouched
    Abort,
}

/// List walking behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Upper bound for every wait against a remote page (milliseconds)
    #[serde(rename = "wait-timeout-ms")]
    pub wait_timeout_ms: u64,

    /// Width of each loading window
    #[serde(rename = "window-step")]
    pub window_step: u32,

    /// See [`DEFAULT_REORDER_THRESHOLD`]
    #[serde(rename = "reorder-threshold")]
    pub reorder_threshold: f64,

    #[serde(rename = "on-item-failure")]
    pub on_item_failure: ItemFailurePolicy,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 3000,
            window_step: 10,
            reorder_threshold: DEFAULT_REORDER_THRESHOLD,
            on_item_failure: ItemFailurePolicy::Skip,
        }
    }
}

/// DOM selectors and attributes of the list and detail pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Container whose element children are the list items
    #[serde(rename = "list-container")]
    pub list_container: String,

    /// Element inside a list item whose text starts with `<number>.`
    #[serde(rename = "item-title")]
    pub item_title: String,

    /// Attribute of a list item carrying its title
    #[serde(rename = "item-title-attribute")]
    pub item_title_attribute: String,

    /// Attribute of a list item carrying its detail link
    #[serde(rename = "item-link-attribute")]
    pub item_link_attribute: String,

    /// Element scrolled into view to make the list load more items
    #[serde(rename = "scroll-target")]
    pub scroll_target: String,

    /// Control switching the list to chronological order
    #[serde(rename = "reorder-control")]
    pub reorder_control: String,

    /// Element that exists once a detail page has rendered
    #[serde(rename = "detail-ready")]
    pub detail_ready: String,

    /// Element holding the detail page's publish date
    #[serde(rename = "publish-time")]
    pub publish_time: String,

    /// Structural blocks scanned for records
    #[serde(rename = "content-blocks")]
    pub content_blocks: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            list_container: ".album__list".to_string(),
            item_title: ".weui-mask-ellipsis__text".to_string(),
            item_title_attribute: "data-title".to_string(),
            item_link_attribute: "data-link".to_string(),
            scroll_target: ".album__list > :last-child".to_string(),
            reorder_control: ".js_positive_order".to_string(),
            detail_ready: "#activity-name".to_string(),
            publish_time: "#publish_time".to_string(),
            content_blocks: "#js_content section".to_string(),
        }
    }
}

/// Record extraction settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// UTC offset the source writes its publish dates in
    #[serde(rename = "publish-utc-offset-hours")]
    pub publish_utc_offset_hours: i32,

    /// Prefix every accepted record URL must start with
    #[serde(rename = "required-url-prefix")]
    pub required_url_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            publish_utc_offset_hours: 8,
            required_url_prefix: "https://".to_string(),
        }
    }
}

/// Search index behaviour and settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Upper bound for waiting on a single index task (milliseconds)
    #[serde(rename = "task-timeout-ms")]
    pub task_timeout_ms: u64,

    /// Delay between two task status polls (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    #[serde(rename = "displayed-attributes")]
    pub displayed_attributes: Vec<String>,

    #[serde(rename = "searchable-attributes")]
    pub searchable_attributes: Vec<String>,

    #[serde(rename = "sortable-attributes")]
    pub sortable_attributes: Vec<String>,

    #[serde(rename = "ranking-rules")]
    pub ranking_rules: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            task_timeout_ms: 5000,
            poll_interval_ms: 50,
            displayed_attributes: ["number", "title", "url", "publishDate"]
                .map(String::from)
                .to_vec(),
            searchable_attributes: vec!["title".to_string()],
            sortable_attributes: vec!["publishTimestamp".to_string()],
            ranking_rules: vec!["publishTimestamp:desc".to_string()],
        }
    }
}

/// Where progress and the run journal live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the TOML file holding the tracked sources
    #[serde(rename = "sources-path")]
    pub sources_path: String,

    /// Path to the SQLite run journal
    #[serde(rename = "journal-path")]
    pub journal_path: String,
}

/// Index service endpoint and credential, taken from the environment
#[derive(Debug, Clone)]
pub struct IndexCredentials {
    pub host: String,
    pub api_key: String,
}

impl IndexCredentials {
    pub const HOST_VAR: &'static str = "MEILI_HOST";
    pub const API_KEY_VAR: &'static str = "MEILI_API_KEY";

    /// Reads `MEILI_HOST` and `MEILI_API_KEY`; both must be set and non-empty
    pub fn from_env() -> Result<Self, crate::ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, crate::ConfigError> {
        let read = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(crate::ConfigError::MissingEnv(name))
        };

        Ok(Self {
            host: read(Self::HOST_VAR)?,
            api_key: read(Self::API_KEY_VAR)?,
        })
    }
}
