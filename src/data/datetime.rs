use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Sentinel returned by `detect_date_format` for RFC 3339 timestamps
/// carrying an offset (e.g. `2025-03-04T08:15:00Z`).
pub const RFC3339_FORMAT: &str = "__rfc3339__";

/// Formats tried against a timestamp column, most specific first.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Pick the format that parses the largest share of the first 100 non-empty cells.
pub fn detect_date_format(values: &[String]) -> Option<&'static str> {
    let sample: Vec<&str> = values
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(100)
        .collect();

    if sample.is_empty() {
        return None;
    }

    let score = |fmt: &str| {
        sample.iter().filter(|s| parse_timestamp(s, fmt).is_some()).count()
    };

    let mut best_format = None;
    let mut best_hits = score(RFC3339_FORMAT);
    if best_hits > 0 {
        best_format = Some(RFC3339_FORMAT);
    }

    for &fmt in DATE_FORMATS {
        let hits = score(fmt);
        if hits > best_hits {
            best_hits = hits;
            best_format = Some(fmt);
        }
    }

    best_format
}

/// Parse one cell with the given format. Date-only formats land on midnight.
/// RFC 3339 values are converted to UTC wall time.
pub fn parse_timestamp(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if format == RFC3339_FORMAT {
        return chrono::DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.naive_utc());
    }

    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, format).ok()?.and_hms_opt(0, 0, 0))
}

/// Parse a user-supplied timestamp (CLI argument), trying every known format.
pub fn parse_any(value: &str) -> Option<NaiveDateTime> {
    std::iter::once(RFC3339_FORMAT)
        .chain(DATE_FORMATS.iter().copied())
        .find_map(|fmt| parse_timestamp(value, fmt))
}

/// Format as `YYYY-MM-DD HH:MM:SS`, adding milliseconds only when present.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// Cheap check used by header detection: does this cell read as a timestamp?
pub fn is_date_like(s: &str) -> bool {
    let s = s.trim();
    let has_separators = s.contains('/') || s.contains(':') || s.contains('-') || s.contains('.');
    if !has_separators || s.parse::<f64>().is_ok() {
        return false;
    }
    parse_any(s).is_some()
}
