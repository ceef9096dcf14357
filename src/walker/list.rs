//! Incremental walk over a lazily loaded list
//!
//! The list page shows its items newest-first and loads more as the last
//! item scrolls into view. Each item's title starts with its sequence
//! number (`"42. Title"`). Given the highest number already indexed, the
//! walker loads just enough of the list to reveal everything newer and
//! snapshots exactly those items.
//!
//! When most of the list is still unseen, walking newest-first would load
//! nearly everything anyway, so the walker flips the list to oldest-first
//! and loads from the already-indexed position upward instead.

use crate::automation::{evaluate, parse_selector, wait_for_condition, wait_for_selector, Browser, Check, Page};
use crate::config::{Config, SelectorConfig, WalkerConfig};
use crate::record::ListItem;
use crate::storage::TrackedSource;
use crate::walker::{WalkState, Windows};
use crate::{DriverResult, HarvestError};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

/// Result of walking one tracked source
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// Newly revealed items, in the order the list showed them
    pub items: Vec<ListItem>,
    /// The source with `current_number` moved up to `newest_number`
    pub source: TrackedSource,
    /// Sequence number of the newest item on the list
    pub newest_number: u32,
    /// Whether the list was walked newest-first
    pub descending: bool,
}

/// Reads the leading sequence number out of an item title
///
/// Returns `None` unless the title starts with digits followed by a dot.
pub fn parse_item_number(title: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^([0-9]+)\.").expect("item number pattern is valid"));
    re.captures(title.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decides whether the list should be walked in its natural newest-first order
///
/// True when the already-indexed share of the list, `current / newest`,
/// exceeds `threshold`: the unseen part is then a minority sitting at the
/// top of the list.
pub fn walks_descending(current: u32, newest: u32, threshold: f64) -> bool {
    newest > 0 && f64::from(current) / f64::from(newest) > threshold
}

/// Parsed list selectors, resolved once per walk
struct ListSelectors {
    container: Selector,
    title: Selector,
    scroll_target: String,
}

impl ListSelectors {
    fn parse(selectors: &SelectorConfig) -> DriverResult<Self> {
        Ok(Self {
            container: parse_selector(&selectors.list_container)?,
            title: parse_selector(&selectors.item_title)?,
            scroll_target: {
                parse_selector(&selectors.scroll_target)?;
                selectors.scroll_target.clone()
            },
        })
    }

    fn items<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document
            .select(&self.container)
            .next()
            .map(|list| list.children().filter_map(ElementRef::wrap).collect())
            .unwrap_or_default()
    }

    fn number_str(&self, item: ElementRef<'_>) -> Option<String> {
        let title = item
            .select(&self.title)
            .next()?
            .text()
            .collect::<String>();
        parse_item_number(&title).map(String::from)
    }

    fn number(&self, item: ElementRef<'_>) -> Option<u32> {
        self.number_str(item)?.parse().ok()
    }
}

/// Walks tracked sources' lists through a page-automation backend
pub struct ListWalker<'a> {
    browser: &'a dyn Browser,
    walker: &'a WalkerConfig,
    selectors: &'a SelectorConfig,
    state: WalkState,
}

impl<'a> ListWalker<'a> {
    pub fn new(browser: &'a dyn Browser, config: &'a Config) -> Self {
        Self {
            browser,
            walker: &config.walker,
            selectors: &config.selectors,
            state: WalkState::Idle,
        }
    }

    /// Current state of the last (or ongoing) walk
    pub fn state(&self) -> WalkState {
        self.state
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.walker.wait_timeout_ms)
    }

    fn transition(&mut self, next: WalkState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid walk transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("Walk state {} -> {}", self.state, next);
        self.state = next;
    }

    /// Walks one source's list and snapshots the items newer than its
    /// `current_number`
    ///
    /// # Errors
    ///
    /// [`HarvestError::Walk`] when the list never appears, the reorder is
    /// never confirmed, or any window fails to load in time.
    pub async fn walk(&mut self, source: &TrackedSource) -> crate::Result<WalkOutcome> {
        self.state = WalkState::Idle;
        let walk_error = |e| HarvestError::Walk {
            source_key: source.key.clone(),
            source: e,
        };

        let page = self.browser.open_page().await.map_err(walk_error)?;
        let result = self.walk_page(page.as_ref(), source).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close list page for '{}': {}", source.key, e);
        }

        result.map_err(walk_error)
    }

    async fn walk_page(&mut self, page: &dyn Page, source: &TrackedSource) -> DriverResult<WalkOutcome> {
        let selectors = ListSelectors::parse(self.selectors)?;
        let timeout = self.timeout();
        let current = source.current_number;

        page.navigate(&source.url).await?;
        wait_for_selector(page, &self.selectors.list_container, timeout).await?;
        self.transition(WalkState::Navigated);

        let newest = evaluate(page, |document| {
            selectors
                .items(document)
                .first()
                .and_then(|first| selectors.number(*first))
                .unwrap_or(0)
        })
        .await?;

        if newest <= current {
            self.transition(WalkState::OrderDetermined);
            if newest < current {
                tracing::warn!(
                    "'{}' reports newest number {} below indexed position {}; leaving progress as is",
                    source.title,
                    newest,
                    current
                );
            } else {
                tracing::info!("'{}' is up to date at {}", source.title, current);
            }
            self.transition(WalkState::Done);
            return Ok(WalkOutcome {
                items: Vec::new(),
                source: source.clone(),
                newest_number: newest,
                descending: true,
            });
        }

        let descending = walks_descending(current, newest, self.walker.reorder_threshold);
        if !descending {
            page.click(&self.selectors.reorder_control).await?;
            wait_for_condition(page, timeout, "list to switch to oldest-first order", |document| {
                match selectors.items(document).first() {
                    Some(first) if selectors.number(*first) == Some(1) => Check::Ready(()),
                    _ => Check::Pending,
                }
            })
            .await?;
        }
        self.transition(WalkState::OrderDetermined);
        tracing::info!(
            "'{}': indexed {} of {}, walking {}",
            source.title,
            current,
            newest,
            if descending { "newest-first" } else { "oldest-first" }
        );

        self.transition(WalkState::Windowing);
        for (lo, hi) in Windows::new(current, newest, self.walker.window_step, descending) {
            tracing::debug!("Loading window [{}, {})", lo, hi);
            let waiting_for = format!("items [{}, {}) to load", lo, hi);
            wait_for_condition(page, timeout, &waiting_for, |document| {
                let last = match selectors.items(document).last().and_then(|el| selectors.number(*el)) {
                    Some(number) => number,
                    None => return Check::Pending,
                };
                let short = if descending { last > lo } else { last < hi };
                if short {
                    Check::Scroll(selectors.scroll_target.clone())
                } else {
                    Check::Ready(())
                }
            })
            .await?;
        }

        self.transition(WalkState::Snapshotting);
        let (start, end) = if descending {
            (0, newest - current)
        } else {
            (current, newest)
        };
        let items = evaluate(page, |document| {
            let elements = selectors.items(document);
            let end = (end as usize).min(elements.len());
            let start = (start as usize).min(end);
            elements[start..end]
                .iter()
                .map(|el| ListItem {
                    title: attribute(*el, &self.selectors.item_title_attribute),
                    link: attribute(*el, &self.selectors.item_link_attribute),
                    number_str: selectors.number_str(*el).unwrap_or_else(|| "0".to_string()),
                })
                .collect::<Vec<_>>()
        })
        .await?;

        let expected = (newest - current) as usize;
        if items.len() != expected {
            tracing::warn!(
                "'{}': expected {} new items, list revealed {}",
                source.title,
                expected,
                items.len()
            );
        }

        self.transition(WalkState::Done);
        Ok(WalkOutcome {
            items,
            source: TrackedSource {
                current_number: newest,
                ..source.clone()
            },
            newest_number: newest,
            descending,
        })
    }
}

fn attribute(element: ElementRef<'_>, name: &str) -> String {
    element.value().attr(name).unwrap_or_default().to_string()
}
