//! Page automation capability traits
//!
//! The harvester never talks to a rendering engine directly. It opens pages
//! through a [`Browser`] and drives them through the small [`Page`] surface
//! below; DOM queries run locally against a parsed snapshot of the page's
//! rendered markup.

use crate::DriverResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Source of fresh pages
///
/// Launching and shutting down the underlying engine is the
/// implementation's business.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a new, blank page
    async fn open_page(&self) -> DriverResult<Box<dyn Page>>;
}

#[async_trait]
impl<B: Browser + ?Sized> Browser for Arc<B> {
    async fn open_page(&self) -> DriverResult<Box<dyn Page>> {
        (**self).open_page().await
    }
}

/// One page context, used by a single task at a time
#[async_trait]
pub trait Page: Send + Sync {
    /// Loads `url` into this page
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Returns the page's current rendered markup
    async fn content(&self) -> DriverResult<String>;

    /// Clicks the first element matching `selector`
    async fn click(&self, selector: &str) -> DriverResult<()>;

    /// Scrolls the first element matching `selector` into view
    async fn scroll_into_view(&self, selector: &str) -> DriverResult<()>;

    /// Subscribes to DOM mutation notifications
    ///
    /// The value is a counter bumped on every mutation; only change
    /// notifications matter. A page whose DOM never changes may keep the
    /// sender alive without ever sending.
    fn mutations(&self) -> watch::Receiver<u64>;

    /// Releases the page
    async fn close(&self) -> DriverResult<()>;
}
