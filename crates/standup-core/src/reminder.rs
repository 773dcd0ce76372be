//! Pre-open and post-deadline reminders.
//!
//! Both triggers are computed from wall-clock comparison against a fixed
//! point with a tolerance of one tick. A window that has fully passed is
//! skipped, never queued; the [`TriggerLedger`](crate::session::TriggerLedger)
//! keeps each one from firing twice.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::calendar::{self, HolidayCalendar};
use crate::config::{MemberId, WorkspaceConfig};
use crate::lifecycle::{self, in_trigger_window};
use crate::render::mention;
use crate::session::{SessionState, WorkspaceState};
use crate::settings::ScheduleSettings;

/// The session date a pre-open reminder should be sent for, if any.
///
/// Both today and tomorrow are considered so that a trigger shortly after
/// local midnight gets its reminder the evening before.
pub fn pre_open_due(
    now: DateTime<Utc>,
    config: &WorkspaceConfig,
    state: &WorkspaceState,
    holidays: &HolidayCalendar,
    schedule: &ScheduleSettings,
) -> Option<NaiveDate> {
    let today = lifecycle::local_date(now, config);
    [today, today + Duration::days(1)].into_iter().find(|date| {
        state.ledger.pre_reminder_on != Some(*date)
            && calendar::is_workday(*date, config, holidays)
            && lifecycle::trigger_instant(*date, config).is_some_and(|open| {
                in_trigger_window(now, open - schedule.pre_reminder_lead(), schedule.tolerance())
            })
    })
}

/// Whether the active session's post-deadline trigger fires at `now`.
///
/// Suppressed on non-workdays unless the session was opened by hand.
pub fn post_deadline_due(
    now: DateTime<Utc>,
    config: &WorkspaceConfig,
    state: &WorkspaceState,
    holidays: &HolidayCalendar,
    schedule: &ScheduleSettings,
) -> bool {
    let Some(session) = &state.session else {
        return false;
    };
    if state.ledger.closed_session == Some(session.opened_at) {
        return false;
    }
    // A deadline past local midnight still belongs to the day it opened.
    if !session.manual && !calendar::is_workday(session.local_date, config, holidays) {
        return false;
    }
    in_trigger_window(
        now,
        session.deadline_at + schedule.post_reminder_delay(),
        schedule.tolerance(),
    )
}

fn mentions<'a>(members: impl IntoIterator<Item = &'a MemberId>) -> String {
    members
        .into_iter()
        .map(|m| mention(m))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Announcement for the upcoming session on `date`.
pub fn pre_open_text(
    date: NaiveDate,
    config: &WorkspaceConfig,
    schedule: &ScheduleSettings,
) -> String {
    let tz = config.tz();
    let deadline = lifecycle::trigger_instant(date, config)
        .map(|open| {
            (open + schedule.deadline_offset())
                .with_timezone(&tz)
                .format("%H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    let mut text = format!(
        "⏰ Daily standup opens at {} ({}) on {}. Post your update before {}.",
        config.trigger_time,
        config.timezone,
        date.format("%A, %B %-d"),
        deadline,
    );
    let eligible = config.eligible_members(std::iter::empty());
    if !eligible.is_empty() {
        text.push('\n');
        text.push_str(&mentions(&eligible));
    }
    text
}

/// Announcement naming members still pending after the deadline, or `None`
/// when everyone has posted.
pub fn post_deadline_text(config: &WorkspaceConfig, session: &SessionState) -> Option<String> {
    let pending = lifecycle::pending_members(config, session);
    if pending.is_empty() {
        return None;
    }
    Some(format!(
        "⌛ Standup deadline passed. Still pending: {}",
        mentions(&pending)
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
