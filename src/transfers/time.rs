//! Timestamp resolution for inconsistently formatted supplier times.
//!
//! Flight times arrive as full ISO datetimes, bare dates, or clock times with
//! or without an AM/PM suffix. Having *some* transfer quote beats hard
//! failure, so resolution always produces an instant: unparseable values fall
//! back to noon UTC of the travel date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Clock-time formats accepted when combining with a fallback date.
/// 12-hour formats are matched against the uppercased input.
const CLOCK_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%I:%M%p", "%I %p", "%I%p"];

fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(12, 0, 0).expect("valid time")))
}

/// Parse a timestamp if any known shape matches; `None` otherwise.
pub fn try_resolve_timestamp(value: &str, fallback_date: NaiveDate) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // ISO datetime without offset, treated as UTC
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(value, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    // Bare date means midnight UTC
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    // Clock time combined with the fallback date
    let upper = value.to_ascii_uppercase();
    for fmt in CLOCK_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(&upper, fmt) {
            return Some(Utc.from_utc_datetime(&fallback_date.and_time(time)));
        }
    }

    None
}

/// Resolve a timestamp, falling back to noon UTC of `fallback_date` when no
/// shape matches.
pub fn resolve_timestamp(value: &str, fallback_date: NaiveDate) -> DateTime<Utc> {
    try_resolve_timestamp(value, fallback_date).unwrap_or_else(|| noon(fallback_date))
}

/// Recommended hotel pickup time for an outbound flight: departure minus the
/// configured lead. An unparseable departure falls back to 08:00 of the
/// travel date.
pub fn pickup_lead_time(
    departure: Option<&str>,
    travel_date: NaiveDate,
    lead_hours: i64,
) -> DateTime<Utc> {
    departure
        .and_then(|value| try_resolve_timestamp(value, travel_date))
        .map(|dt| dt - Duration::hours(lead_hours))
        .unwrap_or_else(|| {
            Utc.from_utc_datetime(
                &travel_date.and_time(NaiveTime::from_hms_opt(8, 0, 0).expect("valid time")),
            )
        })
}
