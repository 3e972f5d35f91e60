//! Lenient decoding for optional date fields.
//!
//! Documents written by other clients carry dates as ISO `YYYY-MM-DD`,
//! full timestamps, or US locale strings (`10/19/2026`). A value that
//! matches none of these decodes as `None` instead of failing the whole
//! document.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a stored date string in any of the accepted shapes.
pub fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

/// `deserialize_with` target for `Option<NaiveDate>` fields.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => {
            let parsed = parse_loose_date(&raw);
            if parsed.is_none() {
                tracing::debug!(raw = %raw, "Unrecognised date, treating as missing");
            }
            parsed
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "lenient_date")]
        date: Option<NaiveDate>,
    }

    fn decode(value: Value) -> Option<NaiveDate> {
        serde_json::from_value::<Holder>(value).unwrap().date
    }

    #[test]
    fn accepts_iso_locale_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 19);
        assert_eq!(decode(json!({"date": "2026-10-19"})), expected);
        assert_eq!(decode(json!({"date": "10/19/2026"})), expected);
        assert_eq!(decode(json!({"date": "2026-10-19T08:30:00.000Z"})), expected);
        assert_eq!(decode(json!({"date": "2026-10-19T08:30:00"})), expected);
    }

    #[test]
    fn unparseable_values_become_none() {
        assert_eq!(decode(json!({"date": "next tuesday"})), None);
        assert_eq!(decode(json!({"date": ""})), None);
        assert_eq!(decode(json!({"date": 1760860800})), None);
        assert_eq!(decode(json!({"date": null})), None);
        assert_eq!(decode(json!({})), None);
    }
}
