//! Bounded waits and queries against a live page
//!
//! A condition is a predicate over a parsed snapshot of the page. It is
//! checked once up front and then again after every DOM mutation the page
//! reports, until it is satisfied or the timeout elapses.

use crate::automation::Page;
use crate::{DriverError, DriverResult};
use scraper::{Html, Selector};
use std::time::Duration;

/// Outcome of checking a condition against one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// The condition holds; stop waiting
    Ready(T),
    /// Not yet; wait for the next mutation
    Pending,
    /// Not yet; scroll the element matching this selector into view to
    /// make the page load more, then wait for the next mutation
    Scroll(String),
}

/// Waits until `predicate` reports [`Check::Ready`], re-checking on mutation
///
/// # Errors
///
/// * [`DriverError::Timeout`] naming `waiting_for` when `timeout` elapses
/// * any error the page raises while reading content or scrolling
pub async fn wait_for_condition<T, F>(
    page: &dyn Page,
    timeout: Duration,
    waiting_for: &str,
    predicate: F,
) -> DriverResult<T>
where
    F: FnMut(&Html) -> Check<T>,
{
    match tokio::time::timeout(timeout, poll_until(page, predicate)).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout {
            waiting_for: waiting_for.to_string(),
            after: timeout,
        }),
    }
}

async fn poll_until<T, F>(page: &dyn Page, mut predicate: F) -> DriverResult<T>
where
    F: FnMut(&Html) -> Check<T>,
{
    let mut mutations = page.mutations();

    loop {
        // Mark everything up to now as seen before taking the snapshot, so a
        // mutation landing while we check is not lost.
        mutations.borrow_and_update();
        let markup = page.content().await?;

        let check = {
            let document = Html::parse_document(&markup);
            predicate(&document)
        };

        match check {
            Check::Ready(value) => return Ok(value),
            Check::Pending => {}
            Check::Scroll(selector) => page.scroll_into_view(&selector).await?,
        }

        if mutations.changed().await.is_err() {
            // The page can no longer change; only the timeout ends this wait.
            std::future::pending::<()>().await;
        }
    }
}

/// Waits until an element matching `selector` is present
pub async fn wait_for_selector(page: &dyn Page, selector: &str, timeout: Duration) -> DriverResult<()> {
    let parsed = parse_selector(selector)?;
    wait_for_condition(page, timeout, &format!("selector '{}'", selector), |document| {
        if document.select(&parsed).next().is_some() {
            Check::Ready(())
        } else {
            Check::Pending
        }
    })
    .await
}

/// Runs `query` once against a snapshot of the page's current markup
pub async fn evaluate<T, F>(page: &dyn Page, query: F) -> DriverResult<T>
where
    F: FnOnce(&Html) -> T,
{
    let markup = page.content().await?;
    let document = Html::parse_document(&markup);
    Ok(query(&document))
}

/// Parses a CSS selector, mapping failures into [`DriverError::Selector`]
pub fn parse_selector(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::Selector(format!("'{}': {}", selector, e)))
}
