/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Session-day schedule.
//!
//! A [`SessionSchedule`] bounds the trading interval between the
//! configured start and end times (optionally pinned to weekdays).
//! Crossing from one window instance to the next is the session-day
//! boundary at which sequence numbers reset.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc, Weekday};

/// The session's active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSchedule {
    start_time: NaiveTime,
    end_time: NaiveTime,
    start_day: Option<Weekday>,
    end_day: Option<Weekday>,
}

impl SessionSchedule {
    /// A window that recurs every day.
    #[must_use]
    pub const fn daily(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
            start_day: None,
            end_day: None,
        }
    }

    /// A window that spans from one weekday to another.
    #[must_use]
    pub const fn weekly(
        start_day: Weekday,
        start_time: NaiveTime,
        end_day: Weekday,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            start_time,
            end_time,
            start_day: Some(start_day),
            end_day: Some(end_day),
        }
    }

    /// The most recent window-start instant at or before `t`.
    fn window_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        match self.start_day {
            None => {
                let candidate = t.date_naive().and_time(self.start_time).and_utc();
                if candidate <= t {
                    candidate
                } else {
                    candidate - ChronoDuration::days(1)
                }
            }
            Some(start_day) => {
                let days_back = (7 + t.weekday().num_days_from_monday() as i64
                    - start_day.num_days_from_monday() as i64)
                    % 7;
                let mut candidate = (t.date_naive() - ChronoDuration::days(days_back))
                    .and_time(self.start_time)
                    .and_utc();
                if candidate > t {
                    candidate -= ChronoDuration::days(7);
                }
                candidate
            }
        }
    }

    /// The end instant of the window beginning at `start`.
    fn window_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match (self.start_day, self.end_day) {
            (Some(start_day), Some(end_day)) => {
                let span = (7 + end_day.num_days_from_monday() as i64
                    - start_day.num_days_from_monday() as i64)
                    % 7;
                (start.date_naive() + ChronoDuration::days(span))
                    .and_time(self.end_time)
                    .and_utc()
            }
            _ => {
                let mut end = start.date_naive().and_time(self.end_time).and_utc();
                if end <= start {
                    end += ChronoDuration::days(1);
                }
                end
            }
        }
    }

    /// True when `t` falls inside an active window.
    #[must_use]
    pub fn is_session_time(&self, t: DateTime<Utc>) -> bool {
        let start = self.window_start(t);
        t <= self.window_end(start)
    }

    /// True when both instants fall in the same window instance. A
    /// `false` for (store creation time, now) marks the session-day
    /// boundary: sequence numbers reset.
    #[must_use]
    pub fn is_same_session(&self, t1: DateTime<Utc>, t2: DateTime<Utc>) -> bool {
        self.window_start(t1) == self.window_start(t2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn nine_to_five() -> SessionSchedule {
        SessionSchedule::daily(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_daily_in_window() {
        let schedule = nine_to_five();
        assert!(schedule.is_session_time(at(2024, 1, 2, 12, 0)));
        assert!(!schedule.is_session_time(at(2024, 1, 2, 18, 0)));
        assert!(!schedule.is_session_time(at(2024, 1, 2, 8, 59)));
    }

    #[test]
    fn test_daily_same_session() {
        let schedule = nine_to_five();
        assert!(schedule.is_same_session(at(2024, 1, 2, 9, 30), at(2024, 1, 2, 16, 0)));
        // different day, different window
        assert!(!schedule.is_same_session(at(2024, 1, 2, 16, 0), at(2024, 1, 3, 9, 30)));
        // before today's start, still yesterday's window
        assert!(schedule.is_same_session(at(2024, 1, 2, 23, 0), at(2024, 1, 3, 8, 0)));
    }

    #[test]
    fn test_overnight_window() {
        let schedule = SessionSchedule::daily(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        );
        assert!(schedule.is_session_time(at(2024, 1, 2, 23, 0)));
        assert!(schedule.is_session_time(at(2024, 1, 3, 5, 0)));
        // one window across midnight
        assert!(schedule.is_same_session(at(2024, 1, 2, 23, 0), at(2024, 1, 3, 5, 0)));
        assert!(!schedule.is_same_session(at(2024, 1, 2, 23, 0), at(2024, 1, 3, 23, 0)));
    }

    #[test]
    fn test_weekly_window() {
        let schedule = SessionSchedule::weekly(
            Weekday::Mon,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            Weekday::Fri,
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        // 2024-01-01 is a Monday
        assert!(schedule.is_session_time(at(2024, 1, 3, 12, 0)));
        assert!(schedule.is_same_session(at(2024, 1, 1, 9, 0), at(2024, 1, 5, 16, 0)));
        // next Monday starts a new week's window
        assert!(!schedule.is_same_session(at(2024, 1, 5, 16, 0), at(2024, 1, 8, 9, 0)));
    }
}
