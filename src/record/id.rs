//! Stable record identifiers
//!
//! Record ids double as the index's primary key, so the same detail page
//! link must always map to the same id: resubmitting it then updates the
//! existing document instead of adding a duplicate.

use crate::UrlError;
use url::Url;

/// Derives a stable, URL- and filesystem-safe id for a record
///
/// The non-empty path segments of `url` are joined with `-`; when the path
/// has none, the first label of the host is used instead. The result is
/// `"{prefix}-{base}"` with every character outside `[A-Za-z0-9_-]`
/// removed. Query strings and fragments never contribute.
///
/// # Errors
///
/// Returns [`UrlError::Parse`] when `url` is not an absolute URL.
///
/// # Example
///
/// ```
/// use tidemark::derive_id;
///
/// let id = derive_id("42", "https://blog.example.com/2024/05/release-notes?ref=feed").unwrap();
/// assert_eq!(id, "42-2024-05-release-notes");
///
/// let id = derive_id("42", "https://crates.io/").unwrap();
/// assert_eq!(id, "42-crates");
/// ```
pub fn derive_id(prefix: &str, url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|source| UrlError::Parse {
        url: url.to_string(),
        source,
    })?;

    let mut base = parsed
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if base.is_empty() {
        base = parsed
            .host_str()
            .and_then(|host| host.split('.').next())
            .unwrap_or_default()
            .to_string();
    }

    Ok(format!("{}-{}", prefix, base)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect())
}
