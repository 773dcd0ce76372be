//! Session data model.
//!
//! A [`SessionState`] is one day's standup: opened at `opened_at`, closing at
//! `deadline_at`, with the live participation map. It is stored inside the
//! per-workspace [`WorkspaceState`] document together with the attendance
//! grid and the trigger ledger, and the whole document is written back in
//! one upsert.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceGrid;
use crate::config::MemberId;

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Edited,
    Deleted,
}

/// A message create/edit/delete observed in the standup channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub member: MemberId,
    pub event_ref: String,
    /// When the message was originally posted.
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(default)]
    pub has_content: bool,
    /// Channel the event came from; events from other channels are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl InboundEvent {
    /// True for a create or edit that leaves a non-empty message behind.
    pub fn is_participation(&self) -> bool {
        self.has_content && matches!(self.kind, EventKind::Created | EventKind::Edited)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub source_event_ref: String,
    pub participated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Authoritative open instant; doubles as the session id.
    pub opened_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    /// Local calendar date the session was opened on.
    pub local_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_display_ref: Option<String>,
    #[serde(default)]
    pub participation: BTreeMap<MemberId, ParticipationRecord>,
    #[serde(default)]
    pub manual: bool,
    /// The last display refresh failed and must be retried.
    #[serde(default)]
    pub display_stale: bool,
}

impl SessionState {
    pub fn new(
        opened_at: DateTime<Utc>,
        local_date: NaiveDate,
        deadline_offset: Duration,
        manual: bool,
    ) -> Self {
        Self {
            opened_at,
            deadline_at: opened_at + deadline_offset,
            local_date,
            summary_display_ref: None,
            participation: BTreeMap::new(),
            manual,
            display_stale: false,
        }
    }

    pub fn id(&self) -> String {
        self.opened_at.to_rfc3339()
    }

    /// Inclusive participation window `[opened_at - lookback, deadline_at]`.
    pub fn window_contains(&self, ts: DateTime<Utc>, lookback: Duration) -> bool {
        ts >= self.opened_at - lookback && ts <= self.deadline_at
    }

    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline_at
    }

    pub fn has_participated(&self, member: &str) -> bool {
        self.participation.contains_key(member)
    }
}

// ---------------------------------------------------------------------------
// TriggerLedger
// ---------------------------------------------------------------------------

/// Dedupe markers that keep every time-based trigger one-shot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerLedger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_on: Option<NaiveDate>,
    /// An automatic open failed on this date; retried every tick that day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_retry_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_reminder_on: Option<NaiveDate>,
    /// `opened_at` of the session whose post-deadline trigger has fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_session: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// BufferedEvent
// ---------------------------------------------------------------------------

/// A participation message that no open session accepted. Replayed into the
/// next session when it falls inside that session's lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferedEvent {
    pub member: MemberId,
    pub event_ref: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// WorkspaceState
// ---------------------------------------------------------------------------

/// The persisted runtime document of one workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionState>,
    #[serde(default)]
    pub attendance: AttendanceGrid,
    #[serde(default)]
    pub ledger: TriggerLedger,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub early_events: Vec<BufferedEvent>,
    /// Members still pending when the previous session closed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_outstanding: Vec<MemberId>,
}

impl WorkspaceState {
    /// Drop buffered events that can no longer fall into any future window.
    pub fn prune_early_events(&mut self, now: DateTime<Utc>, lookback: Duration) {
        let horizon = now - Duration::hours(24) - lookback;
        self.early_events.retain(|e| e.timestamp >= horizon);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
