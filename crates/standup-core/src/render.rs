//! Summary rendering.
//!
//! [`render`] is a pure function of its inputs: every collection it walks is
//! ordered, so rendering the same state twice yields byte-identical output.
//! The engine pushes the result into the single display handle stored on the
//! session instead of posting a new artifact on every change.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::{AttendanceGrid, WeekKey};
use crate::calendar::{self, HolidayCalendar};
use crate::config::{MemberId, WorkspaceConfig};
use crate::session::SessionState;

const WEEKDAY_LABELS: [&str; 5] = ["Mon", "Tue", "Wed", "Thu", "Fri"];
const NOBODY: &str = "-";

/// Chat mention markup for a member id.
pub fn mention(member: &str) -> String {
    format!("<@{member}>")
}

// ---------------------------------------------------------------------------
// SummaryDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub total: usize,
    pub participated: usize,
    pub pending: usize,
}

/// What the display surface shows for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDocument {
    pub title: String,
    pub description: String,
    pub fields: Vec<SummaryField>,
    pub footer: String,
    pub counts: SummaryCounts,
    pub participated: Vec<MemberId>,
    pub pending: Vec<MemberId>,
}

impl SummaryDocument {
    pub fn to_markdown(&self) -> String {
        let mut out = format!("**{}**\n{}\n", self.title, self.description);
        for field in &self.fields {
            out.push_str(&format!("\n**{}**\n{}\n", field.name, field.value));
        }
        out.push_str(&format!("\n_{}_", self.footer));
        out
    }
}

impl fmt::Display for SummaryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

// ---------------------------------------------------------------------------
// Attendance table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCell {
    Participated,
    /// A workday that has fully elapsed without a record.
    Missed,
    /// Non-workday, today, or a future day.
    Skipped,
}

impl DayCell {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Participated => "✅",
            Self::Missed => "❌",
            Self::Skipped => "➖",
        }
    }
}

pub fn day_cell(
    grid: &AttendanceGrid,
    member: &str,
    day: NaiveDate,
    today: NaiveDate,
    config: &WorkspaceConfig,
    holidays: &HolidayCalendar,
) -> DayCell {
    if grid.attended(member, day) {
        DayCell::Participated
    } else if day < today && calendar::is_workday(day, config, holidays) {
        DayCell::Missed
    } else {
        DayCell::Skipped
    }
}

fn week_table(
    members: &BTreeSet<MemberId>,
    grid: &AttendanceGrid,
    week_of: NaiveDate,
    today: NaiveDate,
    config: &WorkspaceConfig,
    holidays: &HolidayCalendar,
) -> String {
    let width = members
        .iter()
        .map(|m| m.chars().count())
        .max()
        .unwrap_or(0)
        .max("Member".len());
    let days = calendar::week_days(week_of);

    let mut lines = vec![format!(
        "{:<width$} {}",
        "Member",
        WEEKDAY_LABELS.join(" ")
    )];
    for member in members {
        let cells: Vec<String> = days
            .iter()
            .map(|d| {
                let glyph = day_cell(grid, member, *d, today, config, holidays).glyph();
                // Emoji render two columns wide; pad to the three-letter labels.
                format!("{glyph} ")
            })
            .collect();
        lines.push(format!("{member:<width$} {}", cells.join("").trim_end()));
    }
    format!("```\n{}\n```", lines.join("\n"))
}

fn mention_list(members: &[MemberId]) -> String {
    if members.is_empty() {
        return NOBODY.to_string();
    }
    members
        .iter()
        .map(|m| mention(m))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Render `session` for display at `now`.
pub fn render(
    config: &WorkspaceConfig,
    session: &SessionState,
    grid: &AttendanceGrid,
    last_outstanding: &[MemberId],
    holidays: &HolidayCalendar,
    now: DateTime<Utc>,
) -> SummaryDocument {
    let tz = config.tz();
    let week = WeekKey::of(session.local_date);
    let eligible =
        config.eligible_members(session.participation.keys().chain(grid.members_in_week(week)));

    let (participated, pending): (Vec<MemberId>, Vec<MemberId>) = eligible
        .iter()
        .cloned()
        .partition(|m| session.has_participated(m));
    let counts = SummaryCounts {
        total: eligible.len(),
        participated: participated.len(),
        pending: pending.len(),
    };

    let deadline = session.deadline_at.with_timezone(&tz);
    let status = if session.is_closed(now) {
        "Closed"
    } else {
        "Open"
    };
    let description = format!(
        "{status}. Post what you finished, what you plan today, and any blockers.\n\
         Deadline: {} ({})\n\
         Updated {}/{}",
        deadline.format("%Y-%m-%d %H:%M"),
        config.timezone,
        counts.participated,
        counts.total,
    );

    let today = now.with_timezone(&tz).date_naive();
    let mut fields = vec![
        SummaryField {
            name: format!("Updated ({})", counts.participated),
            value: mention_list(&participated),
        },
        SummaryField {
            name: format!("Pending ({})", counts.pending),
            value: mention_list(&pending),
        },
        SummaryField {
            name: format!("Attendance {week}"),
            value: week_table(&eligible, grid, session.local_date, today, config, holidays),
        },
    ];
    let outstanding: Vec<MemberId> = last_outstanding
        .iter()
        .filter(|m| !config.is_excluded(m))
        .cloned()
        .collect();
    if !outstanding.is_empty() {
        fields.push(SummaryField {
            name: "Outstanding last time".to_string(),
            value: mention_list(&outstanding),
        });
    }

    let mut title = format!("DAILY STANDUP MEETING - {}", session.local_date);
    if session.manual {
        title.push_str(" (manual)");
    }

    SummaryDocument {
        title,
        description,
        fields,
        footer: format!("Session {}", session.id()),
        counts,
        participated,
        pending,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ParticipationRecord;
    use chrono::{Duration, TimeZone};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, d, h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn fixture() -> (WorkspaceConfig, SessionState, AttendanceGrid) {
        let mut config = WorkspaceConfig::default();
        config.members.extend(
            ["alice", "bob", "carol", "bot"]
                .into_iter()
                .map(String::from),
        );
        config.excluded_members.insert("bot".into());

        // Wednesday session.
        let mut session = SessionState::new(at(21, 9, 0), date(21), Duration::minutes(735), false);
        session.participation.insert(
            "alice".into(),
            ParticipationRecord {
                source_event_ref: "m1".into(),
                participated_at: at(21, 9, 5),
            },
        );

        let mut grid = AttendanceGrid::default();
        grid.mark("alice", date(19));
        grid.mark("alice", date(21));
        grid.mark("bob", date(20));
        (config, session, grid)
    }

    #[test]
    fn counts_and_lists_exclude_excluded_members() {
        let (config, session, grid) = fixture();
        let doc = render(&config, &session, &grid, &[], &HolidayCalendar::empty(), at(21, 10, 0));
        assert_eq!(
            doc.counts,
            SummaryCounts {
                total: 3,
                participated: 1,
                pending: 2
            }
        );
        assert_eq!(doc.participated, vec!["alice".to_string()]);
        assert_eq!(doc.pending, vec!["bob".to_string(), "carol".to_string()]);
        assert!(!doc.to_markdown().contains("bot"));
        assert_eq!(doc.fields[1].value, "<@bob> <@carol>");
        assert!(doc.description.contains("Updated 1/3"));
    }

    #[test]
    fn render_is_idempotent() {
        let (config, session, grid) = fixture();
        let cal = HolidayCalendar::default();
        let a = render(&config, &session, &grid, &["bob".into()], &cal, at(21, 10, 0));
        let b = render(&config, &session, &grid, &["bob".into()], &cal, at(21, 10, 0));
        assert_eq!(a, b);
        assert_eq!(a.to_markdown(), b.to_markdown());
    }

    #[test]
    fn week_cells_distinguish_missed_and_skipped() {
        let (mut config, _, grid) = fixture();
        config.manual_skip_dates.insert(date(20));
        let cal = HolidayCalendar::empty();
        let today = date(21);

        assert_eq!(day_cell(&grid, "alice", date(19), today, &config, &cal), DayCell::Participated);
        assert_eq!(day_cell(&grid, "carol", date(19), today, &config, &cal), DayCell::Missed);
        // Tuesday was skipped for everyone without a record.
        assert_eq!(day_cell(&grid, "carol", date(20), today, &config, &cal), DayCell::Skipped);
        // Recorded attendance shows even on a skip date.
        assert_eq!(day_cell(&grid, "bob", date(20), today, &config, &cal), DayCell::Participated);
        // Today and the future are not yet missed.
        assert_eq!(day_cell(&grid, "carol", date(21), today, &config, &cal), DayCell::Skipped);
        assert_eq!(day_cell(&grid, "carol", date(23), today, &config, &cal), DayCell::Skipped);
    }

    #[test]
    fn week_table_rows_are_sorted() {
        let (config, session, grid) = fixture();
        let doc = render(&config, &session, &grid, &[], &HolidayCalendar::empty(), at(21, 10, 0));
        let table = &doc.fields[2].value;
        assert_eq!(doc.fields[2].name, "Attendance 2026-W43");
        let rows: Vec<&str> = table.lines().collect();
        assert_eq!(rows[1], "Member Mon Tue Wed Thu Fri");
        assert_eq!(rows[2], "alice  ✅ ❌ ✅ ➖ ➖");
        assert_eq!(rows[3], "bob    ❌ ✅ ➖ ➖ ➖");
        assert_eq!(rows[4], "carol  ❌ ❌ ➖ ➖ ➖");
        assert_eq!(rows[5], "```");
    }

    #[test]
    fn outstanding_line_only_when_present() {
        let (config, session, grid) = fixture();
        let cal = HolidayCalendar::empty();
        let without = render(&config, &session, &grid, &[], &cal, at(21, 10, 0));
        assert_eq!(without.fields.len(), 3);
        let with = render(&config, &session, &grid, &["carol".into(), "bot".into()], &cal, at(21, 10, 0));
        assert_eq!(with.fields[3].value, "<@carol>");
    }

    #[test]
    fn closed_after_deadline() {
        let (config, session, grid) = fixture();
        let doc = render(&config, &session, &grid, &[], &HolidayCalendar::empty(), at(21, 21, 16));
        assert!(doc.description.starts_with("Closed."));
        assert!(doc.description.contains("Deadline: 2026-10-21 21:15 (UTC)"));
    }
}
