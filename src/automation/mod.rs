//! Page automation capability
//!
//! This module contains:
//! - the `Browser` / `Page` traits the walker and pipeline drive
//! - bounded, mutation-driven waits and snapshot queries built on them
//! - a headless Chromium driver for rendered, lazily loading pages
//! - a static HTTP driver for pages that need no script execution

mod chromium;
mod http;
mod traits;
mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use chromium::{ChromiumBrowser, ChromiumPage};
pub use http::{build_http_client, user_agent_string, HttpBrowser, HttpPage};
pub use traits::{Browser, Page};
pub use wait::{evaluate, parse_selector, wait_for_condition, wait_for_selector, Check};
