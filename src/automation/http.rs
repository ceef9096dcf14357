//! Static HTTP page driver
//!
//! This driver fetches pages with a plain HTTP GET and serves the returned
//! markup as the page content. It executes no scripts, so its DOM never
//! mutates and it cannot click or scroll. It is enough for server-rendered
//! detail pages and for lists that are fully present in the initial
//! response; anything needing interaction reports
//! [`DriverError::Unsupported`].

use crate::automation::{Browser, Page};
use crate::config::UserAgentConfig;
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

/// Builds an HTTP client identifying itself with the configured user agent
///
/// # Example
///
/// ```no_run
/// use tidemark::config::UserAgentConfig;
/// use tidemark::automation::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Tidemark".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: Name/Version (+ContactURL; ContactEmail)
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent header value
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// [`Browser`] handing out static HTTP pages sharing one client
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UserAgentConfig) -> DriverResult<Self> {
        let client = build_http_client(config).map_err(|e| DriverError::Navigation {
            url: String::new(),
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_page(&self) -> DriverResult<Box<dyn Page>> {
        Ok(Box::new(HttpPage::new(self.client.clone())))
    }
}

/// A page whose content is the body of the last successful GET
pub struct HttpPage {
    client: Client,
    body: Mutex<String>,
    closed: AtomicBool,
    mutations: watch::Sender<u64>,
}

impl HttpPage {
    pub fn new(client: Client) -> Self {
        let (mutations, _) = watch::channel(0);
        Self {
            client,
            body: Mutex::new(BLANK_PAGE.to_string()),
            closed: AtomicBool::new(false),
            mutations,
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.ensure_open()?;
        tracing::debug!("GET {}", url);

        let navigation_error = |message: String| DriverError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                navigation_error("request timeout".to_string())
            } else if e.is_connect() {
                navigation_error("connection refused".to_string())
            } else {
                navigation_error(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        *self.body.lock().map_err(|_| DriverError::Closed)? = body;
        Ok(())
    }

    async fn content(&self) -> DriverResult<String> {
        self.ensure_open()?;
        let body = self.body.lock().map_err(|_| DriverError::Closed)?;
        Ok(body.clone())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        Err(DriverError::Unsupported(format!(
            "static HTTP pages cannot click '{}'",
            selector
        )))
    }

    async fn scroll_into_view(&self, selector: &str) -> DriverResult<()> {
        Err(DriverError::Unsupported(format!(
            "static HTTP pages cannot scroll '{}' into view",
            selector
        )))
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    async fn close(&self) -> DriverResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
