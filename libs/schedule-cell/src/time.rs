// libs/schedule-cell/src/time.rs
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::ScheduleError;

/// Fixed weekday enumeration. Day names double as wire/storage keys, so the
/// mapping from a date must never depend on locale or environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an "HH:MM" wall-clock string into a minute-of-day offset.
/// Hours must be in [0,24), minutes in [0,60).
pub fn to_minutes(t: &str) -> Result<u16, ScheduleError> {
    let invalid = || ScheduleError::Validation(format!("Invalid time '{}': expected HH:MM", t));

    let (h, m) = t.split_once(':').ok_or_else(invalid)?;
    let hours: u16 = h.parse().map_err(|_| invalid())?;
    let minutes: u16 = m.parse().map_err(|_| invalid())?;

    if hours >= 24 || minutes >= 60 {
        return Err(invalid());
    }

    Ok(hours * 60 + minutes)
}

/// Zero-padded inverse of `to_minutes` for valid inputs.
pub fn to_time_string(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open interval intersection: [a_start,a_end) against [b_start,b_end).
/// Adjacent ranges (a_end == b_start) do not overlap.
pub fn overlaps(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn to_minutes_parses_valid_times() {
        assert_eq!(to_minutes("00:00").unwrap(), 0);
        assert_eq!(to_minutes("09:30").unwrap(), 570);
        assert_eq!(to_minutes("9:30").unwrap(), 570);
        assert_eq!(to_minutes("23:59").unwrap(), 1439);
    }

    #[test]
    fn to_minutes_rejects_malformed_input() {
        for bad in ["", "12", "12:", ":30", "24:00", "12:60", "aa:bb", "12.30", "-1:00"] {
            assert_matches!(to_minutes(bad), Err(ScheduleError::Validation(_)), "{}", bad);
        }
    }

    #[test]
    fn time_string_round_trips_for_every_minute_of_day() {
        for m in 0u16..1440 {
            let s = to_time_string(m);
            assert_eq!(to_minutes(&s).unwrap(), m);
        }
    }

    #[test]
    fn overlaps_is_symmetric() {
        let cases = [
            (540, 570, 550, 600),
            (540, 570, 570, 600),
            (0, 1440, 720, 750),
            (100, 200, 300, 400),
        ];
        for (a1, a2, b1, b2) in cases {
            assert_eq!(overlaps(a1, a2, b1, b2), overlaps(b1, b2, a1, a2));
        }
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        assert!(!overlaps(540, 570, 570, 600));
        assert!(overlaps(540, 571, 570, 600));
    }

    #[test]
    fn contained_range_overlaps() {
        assert!(overlaps(0, 1440, 600, 630));
    }

    #[test]
    fn weekday_mapping_is_fixed() {
        // 2026-03-02 is a Monday
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(Weekday::from_date(monday), Weekday::Monday);
        assert_eq!(Weekday::from_date(monday + chrono::Duration::days(5)), Weekday::Saturday);
        assert_eq!(Weekday::from_date(monday + chrono::Duration::days(6)), Weekday::Sunday);
    }
}
