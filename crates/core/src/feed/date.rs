use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parses a feed date: RFC 822/2822 first, then ISO 8601.
///
/// ISO values without an offset are taken as UTC.
pub fn parse_date(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = OffsetDateTime::parse(value, &Rfc2822) {
        return Some(date);
    }
    if let Ok(date) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(date);
    }

    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(date) = PrimitiveDateTime::parse(value.trim_end_matches('Z'), naive) {
        return Some(date.assume_utc());
    }

    let naive_space = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(date) = PrimitiveDateTime::parse(value, naive_space) {
        return Some(date.assume_utc());
    }

    let day = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(value, day) {
        return Some(date.midnight().assume_utc());
    }

    tracing::debug!(value, "unrecognized feed date");
    None
}
