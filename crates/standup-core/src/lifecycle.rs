//! Session lifecycle: Idle → Active once per workspace per calendar day.
//!
//! The decision functions here are pure; [`crate::engine::Engine`] drives
//! them from the periodic tick and only persists the prepared state after the
//! opening summary has been displayed.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::calendar::{self, HolidayCalendar};
use crate::config::{MemberId, WorkspaceConfig};
use crate::session::{SessionState, WorkspaceState};
use crate::settings::ScheduleSettings;
use crate::tracker;

/// Why a tick did not open a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    NotWorkday,
    AlreadyOpened,
    NotTriggerTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenDecision {
    Open { local_date: NaiveDate },
    Idle(IdleReason),
}

/// `now` falls in `[point, point + tolerance)`. A trigger point whose window
/// has fully passed is never reported again.
pub fn in_trigger_window(now: DateTime<Utc>, point: DateTime<Utc>, tolerance: Duration) -> bool {
    now >= point && now < point + tolerance
}

/// The workspace's local calendar date at `now`.
pub fn local_date(now: DateTime<Utc>, config: &WorkspaceConfig) -> NaiveDate {
    now.with_timezone(&config.tz()).date_naive()
}

/// Today's open instant for the configured trigger time.
pub fn trigger_instant(date: NaiveDate, config: &WorkspaceConfig) -> Option<DateTime<Utc>> {
    calendar::local_instant(date, config.trigger_time.as_naive_time(), config.tz())
}

/// The next scheduled open strictly after `now`: today's trigger if it is
/// still ahead and today is a workday, otherwise the next workday's.
pub fn next_open(
    now: DateTime<Utc>,
    config: &WorkspaceConfig,
    holidays: &HolidayCalendar,
) -> Option<DateTime<Utc>> {
    let today = local_date(now, config);
    if calendar::is_workday(today, config, holidays) {
        if let Some(instant) = trigger_instant(today, config).filter(|t| *t > now) {
            return Some(instant);
        }
    }
    let mut day = today;
    loop {
        day = calendar::next_workday(day, config, holidays)?;
        // A trigger time skipped by a DST gap has no instant that day.
        if let Some(instant) = trigger_instant(day, config) {
            return Some(instant);
        }
    }
}

/// Decide whether the tick at `now` should open today's session.
pub fn decide_open(
    now: DateTime<Utc>,
    config: &WorkspaceConfig,
    state: &WorkspaceState,
    holidays: &HolidayCalendar,
    schedule: &ScheduleSettings,
) -> OpenDecision {
    let today = local_date(now, config);
    if !calendar::is_workday(today, config, holidays) {
        return OpenDecision::Idle(IdleReason::NotWorkday);
    }
    if state.ledger.last_opened_on == Some(today) {
        return OpenDecision::Idle(IdleReason::AlreadyOpened);
    }
    if state.ledger.open_retry_on == Some(today) {
        return OpenDecision::Open { local_date: today };
    }
    match trigger_instant(today, config) {
        Some(point) if in_trigger_window(now, point, schedule.tolerance()) => {
            OpenDecision::Open { local_date: today }
        }
        _ => OpenDecision::Idle(IdleReason::NotTriggerTime),
    }
}

/// Members that have not participated in `session`.
pub fn pending_members(config: &WorkspaceConfig, session: &SessionState) -> Vec<MemberId> {
    config
        .eligible_members(session.participation.keys())
        .into_iter()
        .filter(|m| !session.has_participated(m))
        .collect()
}

/// Build the state that replaces `state` when a session opens at `now`.
///
/// The previous session is superseded wholesale; only its still-pending
/// members are carried over for display. Buffered early messages that fall
/// in the new window are credited immediately.
pub fn prepare_open(
    state: &WorkspaceState,
    config: &WorkspaceConfig,
    now: DateTime<Utc>,
    local_date: NaiveDate,
    schedule: &ScheduleSettings,
    manual: bool,
) -> WorkspaceState {
    let mut next = state.clone();
    next.last_outstanding = state
        .session
        .as_ref()
        .map(|previous| pending_members(config, previous))
        .unwrap_or_default();
    next.session = Some(SessionState::new(
        now,
        local_date,
        schedule.deadline_offset(),
        manual,
    ));
    next.ledger.last_opened_on = Some(local_date);
    next.ledger.open_retry_on = None;

    let replayed = tracker::replay_buffered(&mut next, config);
    if replayed > 0 {
        tracing::debug!(replayed, "credited early messages to new session");
    }
    next.prune_early_events(now, config.lookback());
    next.attendance.prune(local_date);
    next
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
