//! Headless Chromium page driver
//!
//! Pages are real Chromium tabs driven over the DevTools protocol, so list
//! pages run their scripts, respond to clicks and load more items when
//! scrolled. DOM changes are detected by a `MutationObserver` installed in
//! every document; a background task polls its counter and forwards changes
//! to the page's mutation channel.

use crate::automation::{user_agent_string, Browser, Page};
use crate::config::{DriverConfig, UserAgentConfig};
use crate::{DriverError, DriverResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Installs the observer once per document and returns its mutation count
const MUTATION_COUNTER: &str = r#"(() => {
    if (window.__tidemarkMutations === undefined) {
        window.__tidemarkMutations = 0;
        new MutationObserver(() => { window.__tidemarkMutations += 1; })
            .observe(document, { childList: true, subtree: true, characterData: true, attributes: true });
    }
    return window.__tidemarkMutations;
})()"#;

fn engine_error(action: impl std::fmt::Display, e: impl std::fmt::Display) -> DriverError {
    DriverError::Engine(format!("{}: {}", action, e))
}

/// [`Browser`] backed by a launched Chromium process
///
/// The caller owns the process lifetime: [`ChromiumBrowser::launch`] starts
/// it and [`ChromiumBrowser::shutdown`] stops it.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
    mutation_poll: Duration,
}

impl ChromiumBrowser {
    /// Launches Chromium with the configured binary, headless mode and user agent
    pub async fn launch(config: &DriverConfig, user_agent: &UserAgentConfig) -> DriverResult<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .arg(format!("--user-agent={}", user_agent_string(user_agent)));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| engine_error("invalid browser configuration", e))?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| engine_error("failed to launch Chromium", e))?;

        // The connection only makes progress while its handler is polled
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        tracing::info!("Launched Chromium (headless: {})", config.headless);
        Ok(Self {
            browser,
            handler,
            mutation_poll: Duration::from_millis(config.mutation_poll_ms),
        })
    }

    /// Closes the browser and waits for the process to exit
    pub async fn shutdown(mut self) -> DriverResult<()> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| engine_error("failed to close Chromium", e));
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for Chromium to exit failed: {}", e);
        }
        self.handler.abort();
        closed.map(|_| ())
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_page(&self) -> DriverResult<Box<dyn Page>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| engine_error("failed to open a tab", e))?;
        Ok(Box::new(ChromiumPage::new(page, self.mutation_poll)))
    }
}

/// One Chromium tab
pub struct ChromiumPage {
    page: chromiumoxide::Page,
    mutations: Arc<watch::Sender<u64>>,
    watcher: JoinHandle<()>,
    closed: AtomicBool,
}

impl ChromiumPage {
    fn new(page: chromiumoxide::Page, poll: Duration) -> Self {
        let (sender, _) = watch::channel(0);
        let mutations = Arc::new(sender);
        let watcher = tokio::spawn(watch_mutations(page.clone(), mutations.clone(), poll));
        Self {
            page,
            mutations,
            watcher,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    async fn find(&self, selector: &str) -> DriverResult<chromiumoxide::Element> {
        self.ensure_open()?;
        self.page
            .find_element(selector)
            .await
            .map_err(|e| engine_error(format!("no element matches '{}'", selector), e))
    }
}

/// Polls the in-page mutation counter, bumping `sender` whenever it moves
async fn watch_mutations(page: chromiumoxide::Page, sender: Arc<watch::Sender<u64>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    let mut seen: Option<u64> = None;

    loop {
        ticker.tick().await;
        let count = match page.evaluate(MUTATION_COUNTER).await {
            Ok(result) => match result.into_value::<f64>() {
                Ok(value) => value as u64,
                Err(_) => continue,
            },
            // Mid-navigation evaluations fail; the next tick retries
            Err(e) => {
                tracing::trace!("Mutation poll failed: {}", e);
                continue;
            }
        };

        if seen != Some(count) {
            seen = Some(count);
            sender.send_modify(|n| *n += 1);
        }
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.ensure_open()?;
        tracing::debug!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.mutations.send_modify(|n| *n += 1);
        Ok(())
    }

    async fn content(&self) -> DriverResult<String> {
        self.ensure_open()?;
        self.page
            .content()
            .await
            .map_err(|e| engine_error("failed to read page content", e))
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let element = self.find(selector).await?;
        element
            .click()
            .await
            .map_err(|e| engine_error(format!("failed to click '{}'", selector), e))?;
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> DriverResult<()> {
        let element = self.find(selector).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| engine_error(format!("failed to scroll '{}' into view", selector), e))?;
        Ok(())
    }

    fn mutations(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }

    async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.watcher.abort();
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| engine_error("failed to close tab", e))
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
