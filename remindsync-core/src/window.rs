//! Lookahead window for fetching upcoming events.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Days ahead of now that a run looks at unless configured otherwise.
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// Half-open time window `[from, to)` that events are fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, String> {
        if to < from {
            return Err(format!("Window end {} is before its start {}", to, from));
        }
        Ok(SyncWindow { from, to })
    }

    /// Window starting now and ending `days` from now.
    pub fn lookahead(days: i64) -> Result<Self, String> {
        Self::lookahead_from(Utc::now(), days)
    }

    pub fn lookahead_from(now: DateTime<Utc>, days: i64) -> Result<Self, String> {
        let to = Duration::try_days(days.max(0))
            .and_then(|span| now.checked_add_signed(span))
            .ok_or_else(|| format!("Lookahead of {} days is out of range", days))?;

        Ok(SyncWindow { from: now, to })
    }

    /// Parse explicit bounds given as YYYY-MM-DD; `to` covers its whole day.
    pub fn from_args(from: &str, to: &str) -> Result<Self, String> {
        let from = parse_date(from)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("Invalid start date '{}'", from))?
            .and_utc();
        let to = parse_date(to)?
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| format!("Invalid end date '{}'", to))?
            .and_utc();

        Self::new(from, to)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lookahead_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        let window = SyncWindow::lookahead_from(now, DEFAULT_LOOKAHEAD_DAYS).unwrap();
        assert_eq!(window.from, now);
        assert_eq!(window.to, Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap());
        assert!(window.contains(now));
        assert!(!window.contains(window.to));
    }

    #[test]
    fn test_lookahead_out_of_range() {
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        assert!(SyncWindow::lookahead_from(now, 100_000_000).is_err());
        assert!(SyncWindow::lookahead_from(now, i64::MAX).is_err());
        assert_eq!(SyncWindow::lookahead_from(now, -3).unwrap().to, now);
    }

    #[test]
    fn test_from_args_covers_end_day() {
        let window = SyncWindow::from_args("2024-03-01", "2024-03-01").unwrap();
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_from_args_rejects_bad_input() {
        assert!(SyncWindow::from_args("03/01/2024", "2024-03-02").is_err());
        assert!(SyncWindow::from_args("2024-03-05", "2024-03-01").is_err());
    }
}
