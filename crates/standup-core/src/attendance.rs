//! Weekly attendance grid.
//!
//! One row of five booleans (Monday..Friday) per member per ISO week. A slot
//! is set when the member participated in the session opened on that day.
//! Slots are never cleared by the tracker: attendance is an append-only
//! record, more durable than the live participation map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::MemberId;

/// Number of ISO weeks kept when the grid is pruned.
pub const RETAINED_WEEKS: i64 = 8;

pub type WeekRow = [bool; 5];

// ---------------------------------------------------------------------------
// WeekKey
// ---------------------------------------------------------------------------

/// An ISO year-week, serialized as `2026-W43`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once("-W")
            .ok_or_else(|| format!("invalid week key: {s}"))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| format!("invalid week key year: {s}"))?;
        let week = week
            .parse::<u32>()
            .map_err(|_| format!("invalid week key week: {s}"))?;
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(format!("week out of range: {s}"));
        }
        Ok(Self { year, week })
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Monday = 0 .. Friday = 4; weekends have no slot.
pub fn weekday_slot(date: NaiveDate) -> Option<usize> {
    match date.weekday() {
        Weekday::Sat | Weekday::Sun => None,
        d => Some(d.num_days_from_monday() as usize),
    }
}

// ---------------------------------------------------------------------------
// AttendanceGrid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceGrid {
    #[serde(default)]
    entries: BTreeMap<MemberId, BTreeMap<WeekKey, WeekRow>>,
}

impl AttendanceGrid {
    /// Mark `member` as present on `date`. Returns whether the slot changed.
    /// Weekend dates have no slot and are ignored.
    pub fn mark(&mut self, member: &str, date: NaiveDate) -> bool {
        let Some(slot) = weekday_slot(date) else {
            return false;
        };
        let row = self
            .entries
            .entry(member.to_string())
            .or_default()
            .entry(WeekKey::of(date))
            .or_default();
        let changed = !row[slot];
        row[slot] = true;
        changed
    }

    pub fn attended(&self, member: &str, date: NaiveDate) -> bool {
        weekday_slot(date).is_some_and(|slot| self.row(member, WeekKey::of(date))[slot])
    }

    pub fn row(&self, member: &str, week: WeekKey) -> WeekRow {
        self.entries
            .get(member)
            .and_then(|weeks| weeks.get(&week))
            .copied()
            .unwrap_or_default()
    }

    /// Members with any recorded slot in `week`.
    pub fn members_in_week(&self, week: WeekKey) -> impl Iterator<Item = &MemberId> {
        self.entries
            .iter()
            .filter(move |(_, weeks)| weeks.get(&week).is_some_and(|row| row.iter().any(|b| *b)))
            .map(|(member, _)| member)
    }

    /// Drop weeks older than the last [`RETAINED_WEEKS`] ISO weeks ending at
    /// `today`'s week.
    pub fn prune(&mut self, today: NaiveDate) {
        let cutoff = WeekKey::of(today - Duration::weeks(RETAINED_WEEKS - 1));
        for weeks in self.entries.values_mut() {
            weeks.retain(|week, _| *week >= cutoff);
        }
        self.entries.retain(|_, weeks| !weeks.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
