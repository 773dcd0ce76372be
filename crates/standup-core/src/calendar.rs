//! Workday and timezone rules.
//!
//! A date is a workday when it is Monday–Friday, is not an organisation
//! holiday for its calendar year, and is not in the workspace's manual skip
//! list. Holidays come from a [`HolidayCalendar`]: fixed month/day entries,
//! offsets from Easter Sunday, and explicit one-off dates.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::WorkspaceConfig;

// ---------------------------------------------------------------------------
// HolidayCalendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedHoliday {
    pub month: u32,
    pub day: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasterHoliday {
    /// Days relative to Easter Sunday (Good Friday is -2).
    pub offset_days: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    #[serde(default = "default_fixed")]
    pub fixed: Vec<FixedHoliday>,
    #[serde(default = "default_easter")]
    pub easter: Vec<EasterHoliday>,
    /// One-off dates that move every year (lunar new year and the like).
    #[serde(default = "default_extra")]
    pub extra: Vec<NaiveDate>,
}

fn fixed(month: u32, day: u32, name: &str) -> FixedHoliday {
    FixedHoliday {
        month,
        day,
        name: name.to_string(),
    }
}

fn default_fixed() -> Vec<FixedHoliday> {
    vec![
        fixed(1, 1, "New Year's Day"),
        fixed(4, 9, "Day of Valor"),
        fixed(5, 1, "Labor Day"),
        fixed(6, 12, "Independence Day"),
        fixed(8, 21, "Ninoy Aquino Day"),
        fixed(8, 26, "National Heroes Day"),
        fixed(11, 30, "Bonifacio Day"),
        fixed(12, 8, "Feast of the Immaculate Conception"),
        fixed(12, 25, "Christmas Day"),
        fixed(12, 30, "Rizal Day"),
        fixed(12, 31, "New Year's Eve"),
    ]
}

fn default_easter() -> Vec<EasterHoliday> {
    vec![
        EasterHoliday {
            offset_days: -3,
            name: "Maundy Thursday".to_string(),
        },
        EasterHoliday {
            offset_days: -2,
            name: "Good Friday".to_string(),
        },
    ]
}

fn default_extra() -> Vec<NaiveDate> {
    [(2025, 1, 29), (2026, 2, 17)]
        .into_iter()
        .filter_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect()
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self {
            fixed: default_fixed(),
            easter: default_easter(),
            extra: default_extra(),
        }
    }
}

impl HolidayCalendar {
    /// A calendar with no holidays at all; only weekends and skip dates apply.
    pub fn empty() -> Self {
        Self {
            fixed: Vec::new(),
            easter: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// All holidays falling in `year`.
    pub fn holidays(&self, year: i32) -> BTreeSet<NaiveDate> {
        let mut out: BTreeSet<NaiveDate> = self
            .fixed
            .iter()
            .filter_map(|h| NaiveDate::from_ymd_opt(year, h.month, h.day))
            .collect();
        if let Some(easter) = easter_sunday(year) {
            out.extend(self.easter.iter().map(|h| easter + Duration::days(h.offset_days)));
        }
        out.extend(self.extra.iter().filter(|d| d.year() == year).copied());
        out
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }
}

/// Easter Sunday for the Gregorian `year` (anonymous Gregorian algorithm).
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

// ---------------------------------------------------------------------------
// Workday rules
// ---------------------------------------------------------------------------

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_workday(date: NaiveDate, config: &WorkspaceConfig, holidays: &HolidayCalendar) -> bool {
    !(is_weekend(date)
        || holidays.is_holiday(date)
        || config.manual_skip_dates.contains(&date))
}

/// First workday strictly after `date`. Gives up after a year of
/// consecutive non-workdays and returns `None`.
pub fn next_workday(
    date: NaiveDate,
    config: &WorkspaceConfig,
    holidays: &HolidayCalendar,
) -> Option<NaiveDate> {
    (1..=366)
        .map(|n| date + Duration::days(n))
        .find(|d| is_workday(*d, config, holidays))
}

/// Monday of the ISO week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// The Monday–Friday dates of the ISO week containing `date`.
pub fn week_days(date: NaiveDate) -> [NaiveDate; 5] {
    let monday = week_monday(date);
    [0, 1, 2, 3, 4].map(|n| monday + Duration::days(n))
}

// ---------------------------------------------------------------------------
// Timezones
// ---------------------------------------------------------------------------

/// Parse an IANA timezone name, falling back to UTC when it is unknown.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = %name, "unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

/// The instant at which the local wall clock in `tz` reads `time` on `date`.
/// Ambiguous times take the earlier instant; times skipped by a DST jump
/// move forward by an hour.
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_time(time);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
