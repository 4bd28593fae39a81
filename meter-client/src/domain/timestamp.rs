use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A local timestamp in one of the shapes upstream producers emit.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampInput {
    /// Already carries its offset.
    Aware(DateTime<FixedOffset>),
    /// Wall-clock value without any zone information.
    Naive(NaiveDateTime),
    /// Unparsed text, with or without a trailing offset.
    Text(String),
}

impl TimestampInput {
    /// Normalize into `tz`.
    ///
    /// Aware values and text ending in `Z`, `+HH:MM` or `+HHMM` are converted
    /// to the zone. Naive values and offset-free text keep their clock value
    /// and are localized. Returns `None` when the text cannot be parsed or the
    /// wall-clock time does not exist in `tz`.
    pub fn to_zone(&self, tz: Tz) -> Option<DateTime<Tz>> {
        match self {
            Self::Aware(ts) => Some(ts.with_timezone(&tz)),
            Self::Naive(naive) => localize(tz, naive),
            Self::Text(raw) => {
                let raw = raw.trim();
                if has_offset_suffix(raw) {
                    parse_with_offset(raw).map(|ts| ts.with_timezone(&tz))
                } else {
                    parse_naive(raw).and_then(|naive| localize(tz, &naive))
                }
            }
        }
    }
}

impl std::fmt::Display for TimestampInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aware(ts) => f.write_str(&ts.to_rfc3339()),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Attach `tz` to a wall-clock value; ambiguous times take the earlier instant.
pub fn localize(tz: Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(naive).earliest()
}

fn has_offset_suffix(raw: &str) -> bool {
    if raw.ends_with('Z') || raw.ends_with('z') {
        return true;
    }
    let bytes = raw.as_bytes();
    let signed_at = |len: usize| {
        bytes.len() > len && matches!(bytes[bytes.len() - len], b'+' | b'-')
    };
    let digits = |range: std::ops::Range<usize>| {
        range.into_iter().all(|i| bytes[bytes.len() - i].is_ascii_digit())
    };
    // +HH:MM
    if signed_at(6) && bytes[bytes.len() - 3] == b':' && digits(1..3) && digits(4..6) {
        return true;
    }
    // +HHMM, but not the day part of a bare date such as 2024-06-15
    signed_at(5) && digits(1..5) && raw.contains(':')
}

fn parse_with_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    let mut text = raw.replacen(' ', "T", 1);
    if text.ends_with('Z') || text.ends_with('z') {
        text.pop();
        text.push_str("+00:00");
    } else if text.as_bytes()[text.len() - 3] != b':' {
        // +HHMM -> +HH:MM
        text.insert(text.len() - 2, ':');
    }
    DateTime::parse_from_rfc3339(&text)
        .or_else(|_| DateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M%:z"))
        .ok()
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use chrono_tz::Europe::Vilnius;

    fn text(s: &str) -> TimestampInput {
        TimestampInput::Text(s.to_string())
    }

    #[test]
    fn aware_values_are_converted() {
        let ts = DateTime::parse_from_rfc3339("2024-06-15T00:00:00+00:00").unwrap();
        let local = TimestampInput::Aware(ts).to_zone(Vilnius).unwrap();
        assert_eq!(local.hour(), 3);
        assert_eq!(local.to_rfc3339(), "2024-06-15T03:00:00+03:00");
    }

    #[test]
    fn offset_text_is_parsed_then_converted() {
        for raw in [
            "2024-06-15T00:00:00Z",
            "2024-06-15 00:00:00+00:00",
            "2024-06-15T02:00:00+0200",
        ] {
            let local = text(raw).to_zone(Vilnius).unwrap();
            assert_eq!(local.to_rfc3339(), "2024-06-15T03:00:00+03:00", "{raw}");
        }
    }

    #[test]
    fn naive_values_keep_clock_value() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(5, 0, 0)
            .unwrap();
        let local = TimestampInput::Naive(naive).to_zone(Vilnius).unwrap();
        assert_eq!(local.to_rfc3339(), "2024-01-10T05:00:00+02:00");

        let local = text("2024-01-10 05:00:00").to_zone(Vilnius).unwrap();
        assert_eq!(local.to_rfc3339(), "2024-01-10T05:00:00+02:00");

        let midnight = text("2024-01-10").to_zone(Vilnius).unwrap();
        assert_eq!(midnight.hour(), 0);
    }

    #[test]
    fn unparseable_and_nonexistent_values_yield_none() {
        assert!(text("not a timestamp").to_zone(Vilnius).is_none());
        assert!(text("").to_zone(Vilnius).is_none());
        // 03:30 does not exist on the spring-forward day.
        assert!(text("2024-03-31T03:30:00").to_zone(Vilnius).is_none());
    }

    #[test]
    fn ambiguous_wall_clock_takes_earlier_instant() {
        let local = text("2024-10-27T03:30:00").to_zone(Vilnius).unwrap();
        assert_eq!(local.to_rfc3339(), "2024-10-27T03:30:00+03:00");
    }
}
