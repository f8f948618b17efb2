use chrono::{Duration, Months, NaiveDateTime};

/// Latest representable timestamp; all additions saturate here
pub const MAX_TIMESTAMP: NaiveDateTime = NaiveDateTime::MAX;

/// Add whole seconds, saturating at `MAX_TIMESTAMP`
pub fn add_seconds(ts: NaiveDateTime, secs: u64) -> NaiveDateTime {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(MAX_TIMESTAMP)
}

/// Add calendar months (day-of-month clamped to the target month), saturating
pub fn add_months(ts: NaiveDateTime, months: u64) -> NaiveDateTime {
    u32::try_from(months)
        .ok()
        .and_then(|m| ts.checked_add_months(Months::new(m)))
        .unwrap_or(MAX_TIMESTAMP)
}

/// Add a days/hours/minutes/seconds span, saturating on any overflow
pub fn add_span(
    ts: NaiveDateTime,
    days: u64,
    hours: u64,
    minutes: u64,
    seconds: u64,
) -> NaiveDateTime {
    let total = days
        .checked_mul(86_400)
        .zip(hours.checked_mul(3_600))
        .and_then(|(d, h)| d.checked_add(h))
        .zip(minutes.checked_mul(60))
        .and_then(|(dh, m)| dh.checked_add(m))
        .and_then(|dhm| dhm.checked_add(seconds));

    match total {
        Some(secs) => add_seconds(ts, secs),
        None => MAX_TIMESTAMP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_add_span() {
        let ts = at(2025, 1, 31, 10, 0);
        assert_eq!(add_span(ts, 1, 2, 3, 0), at(2025, 2, 1, 12, 3));
        assert_eq!(add_span(ts, 0, 0, 0, 0), ts);
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(at(2025, 1, 31, 10, 0), 1), at(2025, 2, 28, 10, 0));
        assert_eq!(add_months(at(2024, 1, 31, 10, 0), 1), at(2024, 2, 29, 10, 0));
        assert_eq!(add_months(at(2024, 2, 29, 8, 0), 12), at(2025, 2, 28, 8, 0));
    }

    #[test]
    fn test_overflow_saturates() {
        let ts = at(2025, 1, 1, 0, 0);
        assert_eq!(add_span(ts, u64::MAX, 0, 0, 0), MAX_TIMESTAMP);
        assert_eq!(add_seconds(ts, u64::MAX), MAX_TIMESTAMP);
        assert_eq!(add_months(ts, u64::from(u32::MAX) * 4), MAX_TIMESTAMP);
        assert_eq!(add_span(MAX_TIMESTAMP, 0, 0, 1, 0), MAX_TIMESTAMP);
    }
}
