use crate::automation::{parse_selector, wait_for_condition, wait_for_selector, Browser, Check, Page};
use crate::config::SelectorConfig;
use crate::record::ListItem;
use crate::{DriverResult, HarvestError};
use std::time::Duration;

/// Opens an item's detail page and returns its markup once rendered
///
/// The page counts as rendered when the heading selector is present and the
/// publish-time element carries text. Each of the two waits is bounded by
/// `timeout`; missing either is a hard failure for this item.
pub async fn fetch_detail(
    browser: &dyn Browser,
    item: &ListItem,
    selectors: &SelectorConfig,
    timeout: Duration,
) -> crate::Result<String> {
    let item_error = |source| HarvestError::Item {
        number: item.number_str.clone(),
        link: item.link.clone(),
        source,
    };

    let page = browser.open_page().await.map_err(item_error)?;
    let result = load_when_ready(page.as_ref(), item, selectors, timeout).await;

    if let Err(e) = page.close().await {
        tracing::debug!("Failed to close detail page {}: {}", item.link, e);
    }

    result.map_err(item_error)
}

async fn load_when_ready(
    page: &dyn Page,
    item: &ListItem,
    selectors: &SelectorConfig,
    timeout: Duration,
) -> DriverResult<String> {
    page.navigate(&item.link).await?;
    wait_for_selector(page, &selectors.detail_ready, timeout).await?;

    let publish_time = parse_selector(&selectors.publish_time)?;
    wait_for_condition(page, timeout, "publish time to be populated", |document| {
        let populated = document
            .select(&publish_time)
            .next()
            .map(|el| !el.text().collect::<String>().trim().is_empty())
            .unwrap_or(false);
        if populated {
            Check::Ready(())
        } else {
            Check::Pending
        }
    })
    .await?;

    page.content().await
}
