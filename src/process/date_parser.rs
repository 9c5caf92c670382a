use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date-time layouts accepted in the `creation_date` / `due_date` columns.
/// `%.f` also matches an absent fraction.
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// Parse an invoice date. Values without an offset are taken as UTC wall-clock time;
/// RFC 3339 values with an offset are converted to UTC.
pub fn parse_invoice_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}
