//! Publish date normalization
//!
//! Detail pages print their publish date in the source's locale, e.g.
//! `2024年05月12日 10:30`. The year and month markers become `-` and the
//! day marker followed by a space becomes the date/time separator, giving
//! `2024-05-12T10:30`, which is then read in the source's UTC offset.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rewrites locale date markers into an ISO-8601 shaped string
pub fn normalize_publish_date(raw: &str) -> String {
    raw.trim()
        .replace(['年', '月'], "-")
        .replace("日 ", "T")
        .replace('日', "")
}

/// Parses a locale-formatted publish date into epoch milliseconds
///
/// Returns `None` when the text cannot be read as a date; callers keep the
/// record and flag the missing timestamp rather than failing.
pub fn parse_publish_timestamp(raw: &str, utc_offset_hours: i32) -> Option<i64> {
    let offset = FixedOffset::east_opt(utc_offset_hours.checked_mul(3600)?)?;
    let normalized = normalize_publish_date(raw);

    let naive = DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(&normalized, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|moment| moment.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_publish_date() {
        assert_eq!(normalize_publish_date("2024年05月12日 10:30"), "2024-05-12T10:30");
        assert_eq!(normalize_publish_date(" 2024年05月12日 "), "2024-05-12");
    }

    #[test]
    fn test_parse_date_time_in_source_offset() {
        // 2024-05-12T10:30+08:00 == 2024-05-12T02:30Z
        assert_eq!(
            parse_publish_timestamp("2024年05月12日 10:30", 8),
            Some(1_715_481_000_000)
        );
        assert_eq!(
            parse_publish_timestamp("2024年05月12日 02:30", 0),
            Some(1_715_481_000_000)
        );
    }

    #[test]
    fn test_parse_date_with_seconds() {
        assert_eq!(
            parse_publish_timestamp("2024年05月12日 02:30:15", 0),
            Some(1_715_481_015_000)
        );
    }

    #[test]
    fn test_parse_date_only() {
        assert_eq!(
            parse_publish_timestamp("2024年05月12日", 0),
            Some(1_715_472_000_000)
        );
    }

    #[test]
    fn test_already_iso_text_is_accepted() {
        assert_eq!(
            parse_publish_timestamp("2024-05-12T02:30", 0),
            Some(1_715_481_000_000)
        );
    }

    #[test]
    fn test_unparseable_dates_yield_none() {
        assert_eq!(parse_publish_timestamp("", 8), None);
        assert_eq!(parse_publish_timestamp("yesterday", 8), None);
        assert_eq!(parse_publish_timestamp("2024年13月40日 10:30", 8), None);
    }
}
