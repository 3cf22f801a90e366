use chrono::{DateTime, Datelike, Duration, Utc};
use chrono_tz::Tz;

use crate::config::MAX_DAYS_LOOKBACK;

/// Inclusive publication-date window sent to the news API, as UTC dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub from_date: String,
    pub to_date: String,
}

impl DateWindow {
    /// Window ending at `now` and reaching `days_lookback` days back.
    ///
    /// The lookback is measured on the wall clock of `tz` (so a DST shift
    /// inside the window does not move the start by an hour), then both ends
    /// are converted to UTC and formatted `YYYY-MM-DD`. The lookback is
    /// clamped to [`MAX_DAYS_LOOKBACK`].
    pub fn ending_at(now: DateTime<Utc>, tz: Tz, days_lookback: u32) -> Self {
        let lookback = Duration::days(i64::from(days_lookback.min(MAX_DAYS_LOOKBACK)));
        let local_now = now.with_timezone(&tz);
        let local_from = local_now
            .naive_local()
            .checked_sub_signed(lookback)
            .and_then(|naive| naive.and_local_timezone(tz).earliest())
            .unwrap_or_else(|| local_now - lookback);

        Self {
            from_date: local_from.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
            to_date: now.format("%Y-%m-%d").to_string(),
        }
    }
}

/// ISO week identifier of `now` in `tz`, e.g. `2024-W03`.
///
/// Used as the idempotency key of a run and as the archive file name.
pub fn iso_week_key(now: DateTime<Utc>, tz: Tz) -> String {
    let week = now.with_timezone(&tz).date_naive().iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}
