//! Records and the list items they are extracted from
//!
//! This module contains:
//! - the `ListItem` reference discovered while walking a list
//! - the `Record` document submitted to the index
//! - stable id derivation, publish date parsing and markup extraction
//! - loading a detail page until it is ready to be extracted

mod date;
mod detail;
mod extractor;
mod id;

pub use date::{normalize_publish_date, parse_publish_timestamp};
pub use detail::fetch_detail;
pub use extractor::{extract_records, find_candidates, select_text, Candidate, ExtractOptions};
pub use id::derive_id;

use serde::{Deserialize, Serialize};

/// A reference to one detail page, as read from the list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub title: String,
    pub link: String,
    /// Leading sequence number of the item, `"0"` when unreadable
    pub number_str: String,
}

/// A document extracted from a detail page
///
/// Field names are camelCase on the wire so the index settings can refer to
/// `publishDate` and `publishTimestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub number: String,
    pub title: String,
    pub url: String,
    pub publish_date: String,
    /// Epoch milliseconds; `None` (serialized as `null`) when the publish
    /// date could not be parsed
    pub publish_timestamp: Option<i64>,
}
