//! Record extraction from rendered detail pages
//!
//! A detail page lists its records as structural blocks: a heading-like
//! paragraph, immediately followed by a `section` whose first child is
//! another `section` ending in a paragraph holding the link text.
//!
//! ```html
//! <p>Announcing Tokio 2.0</p>
//! <section>
//!   <section>
//!     <p>some blurb</p>
//!     <p>https://tokio.rs/blog/2024-tokio-2</p>
//!   </section>
//! </section>
//! ```

use crate::config::{ExtractorConfig, SelectorConfig};
use crate::record::date::parse_publish_timestamp;
use crate::record::id::derive_id;
use crate::record::{ListItem, Record};
use scraper::{ElementRef, Html, Selector};

/// Options steering extraction for one tracked source
#[derive(Debug, Clone)]
pub struct ExtractOptions<'a> {
    pub selectors: &'a SelectorConfig,
    pub extractor: &'a ExtractorConfig,
    /// Replaces the item number as id prefix when set
    pub id_prefix: Option<&'a str>,
}

/// A block that passed the structural checks but not yet content checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
}

/// Extracts every record of one detail page
///
/// Candidates with an empty title, a URL lacking the required prefix, or a
/// URL that cannot be turned into an id are dropped. A page without a
/// readable publish date still yields records, with `publish_timestamp`
/// left empty.
pub fn extract_records(markup: &str, item: &ListItem, options: &ExtractOptions<'_>) -> Vec<Record> {
    let document = Html::parse_document(markup);

    let publish_date = select_text(&document, &options.selectors.publish_time).unwrap_or_default();
    let publish_timestamp =
        parse_publish_timestamp(&publish_date, options.extractor.publish_utc_offset_hours);
    if publish_timestamp.is_none() {
        tracing::warn!(
            "Unparseable publish date '{}' on {} (item {})",
            publish_date,
            item.link,
            item.number_str
        );
    }

    let prefix = options.id_prefix.unwrap_or(item.number_str.as_str());

    find_candidates(&document, &options.selectors.content_blocks)
        .into_iter()
        .filter_map(|candidate| {
            if candidate.title.is_empty()
                || !candidate
                    .url
                    .starts_with(&options.extractor.required_url_prefix)
            {
                tracing::debug!("Rejected candidate {:?} on {}", candidate, item.link);
                return None;
            }

            match derive_id(prefix, &candidate.url) {
                Ok(id) => Some(Record {
                    id,
                    number: item.number_str.clone(),
                    title: candidate.title,
                    url: candidate.url,
                    publish_date: publish_date.clone(),
                    publish_timestamp,
                }),
                Err(e) => {
                    tracing::debug!("Rejected candidate on {}: {}", item.link, e);
                    None
                }
            }
        })
        .collect()
}

/// Finds all structurally qualified (title, url) pairs in a document
pub fn find_candidates(document: &Html, block_selector: &str) -> Vec<Candidate> {
    let selector = match Selector::parse(block_selector) {
        Ok(selector) => selector,
        Err(e) => {
            tracing::warn!("Invalid content block selector '{}': {}", block_selector, e);
            return Vec::new();
        }
    };

    document
        .select(&selector)
        .filter_map(|block| {
            let heading = previous_element(block).filter(|el| is_tag(el, "p"))?;
            let inner = first_child_element(block).filter(|el| is_tag(el, "section"))?;
            let link = last_child_element(inner).filter(|el| is_tag(el, "p"))?;

            Some(Candidate {
                title: element_text(heading),
                url: element_text(link),
            })
        })
        .collect()
}

/// Returns the trimmed text of the first element matching `selector`
pub fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(element_text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn is_tag(element: &ElementRef<'_>, name: &str) -> bool {
    element.value().name().eq_ignore_ascii_case(name)
}

fn previous_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.prev_siblings().find_map(ElementRef::wrap)
}

fn first_child_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.children().find_map(ElementRef::wrap)
}

fn last_child_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap).last()
}
