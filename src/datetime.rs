use chrono::{DateTime, Duration, NaiveTime, Utc};

#[cfg(not(test))]
/// Returns the current UTC time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Half-open UTC day window `[midnight, midnight + 1 day)` containing `now`.
///
/// Used to scope the "today" totals attached to start/stop/status reports.
pub fn day_bounds(now: &DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}


#[cfg(test)]
pub use mock_datetime::now;

#[cfg(test)]
mod tests {
    use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

    use super::day_bounds;
    use super::mock_datetime;

    /// Without a mock set, the real current time is returned.
    ///
    ///  - Compared at second precision; millisecond comparison against the
    ///    real clock would be flaky.
    #[test]
    fn test_now() {
        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// A mocked time is returned as set.
    #[test]
    fn test_now_specific_datetime() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );

        assert_eq!(mock_datetime::now().to_rfc3339(), datetime);
    }

    /// Clearing the mock restores the real clock.
    #[test]
    fn test_now_after_clear_mock_time() {
        let datetime = String::from("2024-01-01T00:00:00+00:00");
        mock_datetime::set_mock_time(
            DateTime::parse_from_rfc3339(datetime.as_str())
                .unwrap()
                .to_utc(),
        );
        mock_datetime::clear_mock_time();

        assert_eq!(
            mock_datetime::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    /// The day window starts at UTC midnight and is one day wide.
    #[test]
    fn test_day_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 13, 45, 12).unwrap();

        let (start, end) = day_bounds(&now);

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());
    }

    /// Midnight itself belongs to the window that starts there.
    #[test]
    fn test_day_bounds_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        let (start, end) = day_bounds(&now);

        assert_eq!(start, now);
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());
    }
}
