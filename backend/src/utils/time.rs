use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Returns the UTC instant at local midnight of `date` in `tz`.
///
/// Used to translate date-only history filters into timestamp bounds.
pub fn start_of_day_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
    match tz.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // DST gap at midnight: fall back to interpreting the wall time as UTC
        chrono::LocalResult::None => Utc.from_utc_datetime(&local),
    }
}

/// Returns the exclusive UTC upper bound for `date` in `tz` (midnight of the
/// following day).
pub fn end_of_day_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let next = date.succ_opt().unwrap_or(date);
    start_of_day_utc(tz, next)
}
