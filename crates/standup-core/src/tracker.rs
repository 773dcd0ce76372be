//! Participation tracking.
//!
//! Classifies message create/edit/delete events against the active session
//! window and the sender's eligibility, and updates the participation map
//! and the attendance grid. Pure state transformation: the engine is
//! responsible for serializing calls per workspace, persisting the result,
//! and refreshing the display.

use chrono::{DateTime, Duration, Utc};

use crate::config::WorkspaceConfig;
use crate::session::{BufferedEvent, InboundEvent, ParticipationRecord, WorkspaceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherChannel,
    Excluded,
    NoSession,
    OutsideWindow,
    /// A delete or edit-away for a message that is not the member's
    /// recorded participation.
    NotSourceEvent,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Participation was added or replaced.
    Recorded,
    /// Participation was removed.
    Retracted,
    /// The early-event buffer changed; no session state was touched.
    Buffered,
    /// Same record as before; nothing to persist.
    Unchanged,
    Ignored(IgnoreReason),
}

impl TrackOutcome {
    /// Whether the displayed summary is now out of date.
    pub fn needs_render(&self) -> bool {
        matches!(self, Self::Recorded | Self::Retracted)
    }

    /// Whether the workspace state must be written back.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Recorded | Self::Retracted | Self::Buffered)
    }
}

/// Apply one inbound event to `state`.
pub fn apply_event(
    state: &mut WorkspaceState,
    config: &WorkspaceConfig,
    event: &InboundEvent,
    now: DateTime<Utc>,
) -> TrackOutcome {
    if let (Some(from), Some(target)) = (&event.channel, &config.target_channel) {
        if from != target {
            return TrackOutcome::Ignored(IgnoreReason::OtherChannel);
        }
    }
    if config.is_excluded(&event.member) {
        return TrackOutcome::Ignored(IgnoreReason::Excluded);
    }

    let lookback = config.lookback();
    if event.is_participation() {
        record(state, event, lookback, now)
    } else {
        retract(state, event, lookback)
    }
}

fn record(
    state: &mut WorkspaceState,
    event: &InboundEvent,
    lookback: Duration,
    now: DateTime<Utc>,
) -> TrackOutcome {
    let in_window = state
        .session
        .as_ref()
        .is_some_and(|s| s.window_contains(event.timestamp, lookback));

    if !in_window {
        return buffer(state, event, lookback, now);
    }

    state.early_events.retain(|e| e.event_ref != event.event_ref);
    let WorkspaceState {
        session, attendance, ..
    } = state;
    let Some(session) = session.as_mut() else {
        return TrackOutcome::Ignored(IgnoreReason::NoSession);
    };
    let next = ParticipationRecord {
        source_event_ref: event.event_ref.clone(),
        participated_at: event.timestamp,
    };
    // Credit the session's day even when the message was posted on another
    // local date inside the window.
    let marked = attendance.mark(&event.member, session.local_date);
    let previous = session.participation.insert(event.member.clone(), next.clone());
    if previous.as_ref() == Some(&next) && !marked {
        TrackOutcome::Unchanged
    } else {
        TrackOutcome::Recorded
    }
}

fn buffer(
    state: &mut WorkspaceState,
    event: &InboundEvent,
    lookback: Duration,
    now: DateTime<Utc>,
) -> TrackOutcome {
    if event.timestamp < now - Duration::hours(24) - lookback {
        return TrackOutcome::Ignored(IgnoreReason::Stale);
    }
    let entry = BufferedEvent {
        member: event.member.clone(),
        event_ref: event.event_ref.clone(),
        timestamp: event.timestamp,
    };
    match state
        .early_events
        .iter_mut()
        .find(|e| e.event_ref == event.event_ref)
    {
        Some(existing) if *existing == entry => return TrackOutcome::Unchanged,
        Some(existing) => *existing = entry,
        None => state.early_events.push(entry),
    }
    state.prune_early_events(now, lookback);
    TrackOutcome::Buffered
}

fn retract(state: &mut WorkspaceState, event: &InboundEvent, lookback: Duration) -> TrackOutcome {
    let buffered_before = state.early_events.len();
    state
        .early_events
        .retain(|e| !(e.event_ref == event.event_ref && e.member == event.member));
    let unbuffered = state.early_events.len() != buffered_before;

    let fallback = if unbuffered {
        TrackOutcome::Buffered
    } else {
        TrackOutcome::Ignored(IgnoreReason::NotSourceEvent)
    };

    let Some(session) = state.session.as_mut() else {
        return if unbuffered {
            fallback
        } else {
            TrackOutcome::Ignored(IgnoreReason::NoSession)
        };
    };
    if !session.window_contains(event.timestamp, lookback) {
        return if unbuffered {
            fallback
        } else {
            TrackOutcome::Ignored(IgnoreReason::OutsideWindow)
        };
    }
    let is_source = session
        .participation
        .get(&event.member)
        .is_some_and(|r| r.source_event_ref == event.event_ref);
    if !is_source {
        return fallback;
    }
    // The attendance slot stays set: attendance is append-only.
    session.participation.remove(&event.member);
    TrackOutcome::Retracted
}

/// Move buffered events that fall inside the freshly opened session's window
/// into its participation map. Returns how many were applied.
pub fn replay_buffered(state: &mut WorkspaceState, config: &WorkspaceConfig) -> usize {
    let lookback = config.lookback();
    let WorkspaceState {
        session,
        attendance,
        early_events,
        ..
    } = state;
    let Some(session) = session.as_mut() else {
        return 0;
    };

    early_events.sort_by_key(|e| e.timestamp);
    let mut applied = 0;
    early_events.retain(|e| {
        if !session.window_contains(e.timestamp, lookback) || config.is_excluded(&e.member) {
            return true;
        }
        session.participation.insert(
            e.member.clone(),
            ParticipationRecord {
                source_event_ref: e.event_ref.clone(),
                participated_at: e.timestamp,
            },
        );
        attendance.mark(&e.member, session.local_date);
        applied += 1;
        false
    });
    applied
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{EventKind, SessionState};
    use chrono::{NaiveDate, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, h, m, s).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn open_state() -> WorkspaceState {
        WorkspaceState {
            session: Some(SessionState::new(
                at(9, 0, 0),
                today(),
                Duration::minutes(735),
                false,
            )),
            ..Default::default()
        }
    }

    fn event(member: &str, r: &str, ts: DateTime<Utc>, kind: EventKind, content: bool) -> InboundEvent {
        InboundEvent {
            member: member.into(),
            event_ref: r.into(),
            timestamp: ts,
            kind,
            has_content: content,
            channel: None,
        }
    }

    fn participants(state: &WorkspaceState) -> Vec<String> {
        state
            .session
            .as_ref()
            .unwrap()
            .participation
            .keys()
            .cloned()
            .collect()
    }

    #[test]
    fn window_edges() {
        let config = WorkspaceConfig::default();
        let now = at(9, 30, 0);

        let mut state = open_state();
        let early = event("a", "m1", at(6, 59, 59), EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &early, now), TrackOutcome::Buffered);
        assert!(participants(&state).is_empty());

        let edge = event("b", "m2", at(7, 0, 1), EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &edge, now), TrackOutcome::Recorded);

        let late = event("c", "m3", at(21, 15, 1), EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &late, now), TrackOutcome::Buffered);
        assert_eq!(participants(&state), vec!["b".to_string()]);
    }

    #[test]
    fn delete_restores_pending_but_keeps_attendance() {
        let config = WorkspaceConfig::default();
        let now = at(9, 10, 0);
        let mut state = open_state();
        let before = state.session.clone();

        let create = event("a", "m1", at(9, 5, 0), EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &create, now), TrackOutcome::Recorded);
        let delete = event("a", "m1", at(9, 5, 0), EventKind::Deleted, false);
        assert_eq!(apply_event(&mut state, &config, &delete, now), TrackOutcome::Retracted);

        assert_eq!(state.session, before);
        assert!(state.attendance.attended("a", today()));
    }

    #[test]
    fn edit_to_empty_retracts_only_the_source_message() {
        let config = WorkspaceConfig::default();
        let now = at(10, 0, 0);
        let mut state = open_state();
        apply_event(&mut state, &config, &event("a", "m1", at(9, 5, 0), EventKind::Created, true), now);
        apply_event(&mut state, &config, &event("a", "m2", at(9, 6, 0), EventKind::Created, true), now);

        // m1 is no longer the recorded source.
        let blank_m1 = event("a", "m1", at(9, 5, 0), EventKind::Edited, false);
        assert_eq!(
            apply_event(&mut state, &config, &blank_m1, now),
            TrackOutcome::Ignored(IgnoreReason::NotSourceEvent)
        );
        assert_eq!(participants(&state), vec!["a".to_string()]);

        let blank_m2 = event("a", "m2", at(9, 6, 0), EventKind::Edited, false);
        assert_eq!(apply_event(&mut state, &config, &blank_m2, now), TrackOutcome::Retracted);
        assert!(participants(&state).is_empty());
    }

    #[test]
    fn repeated_edit_is_unchanged() {
        let config = WorkspaceConfig::default();
        let now = at(10, 0, 0);
        let mut state = open_state();
        let e = event("a", "m1", at(9, 5, 0), EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &e, now), TrackOutcome::Recorded);
        let edit = event("a", "m1", at(9, 5, 0), EventKind::Edited, true);
        assert_eq!(apply_event(&mut state, &config, &edit, now), TrackOutcome::Unchanged);
    }

    #[test]
    fn excluded_member_never_participates() {
        let mut config = WorkspaceConfig::default();
        config.excluded_members.insert("bot".into());
        let mut state = open_state();
        let before = state.clone();
        let e = event("bot", "m1", at(9, 5, 0), EventKind::Created, true);
        assert_eq!(
            apply_event(&mut state, &config, &e, at(9, 6, 0)),
            TrackOutcome::Ignored(IgnoreReason::Excluded)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn other_channel_is_ignored() {
        let mut config = WorkspaceConfig::default();
        config.target_channel = Some("standup".into());
        let mut state = open_state();
        let mut e = event("a", "m1", at(9, 5, 0), EventKind::Created, true);
        e.channel = Some("random".into());
        assert_eq!(
            apply_event(&mut state, &config, &e, at(9, 6, 0)),
            TrackOutcome::Ignored(IgnoreReason::OtherChannel)
        );
    }

    #[test]
    fn early_message_is_replayed_on_open() {
        let config = WorkspaceConfig::default();
        let mut state = WorkspaceState::default();
        let early = event("a", "m1", at(7, 10, 0), EventKind::Created, true);
        assert_eq!(
            apply_event(&mut state, &config, &early, at(7, 10, 0)),
            TrackOutcome::Buffered
        );

        state.session = Some(SessionState::new(at(9, 0, 0), today(), Duration::minutes(735), false));
        assert_eq!(replay_buffered(&mut state, &config), 1);
        assert_eq!(participants(&state), vec!["a".to_string()]);
        assert!(state.early_events.is_empty());
        assert!(state.attendance.attended("a", today()));
    }

    #[test]
    fn lookback_message_from_previous_day_credits_session_day() {
        let config = WorkspaceConfig::default();
        let tuesday = today().succ_opt().unwrap();
        let opened = at(1, 0, 0) + Duration::days(1);
        let mut state = WorkspaceState {
            session: Some(SessionState::new(opened, tuesday, Duration::minutes(735), false)),
            ..Default::default()
        };
        // Monday 23:30, inside the two hour lookback.
        let e = event("a", "m1", at(23, 30, 0), EventKind::Created, true);
        assert_eq!(
            apply_event(&mut state, &config, &e, opened + Duration::minutes(5)),
            TrackOutcome::Recorded
        );
        assert!(state.attendance.attended("a", tuesday));
        assert!(!state.attendance.attended("a", today()));
    }

    #[test]
    fn post_after_midnight_credits_session_day() {
        let config = WorkspaceConfig::default();
        let mut state = WorkspaceState {
            session: Some(SessionState::new(at(14, 0, 0), today(), Duration::minutes(735), false)),
            ..Default::default()
        };
        let tuesday = at(0, 30, 0) + Duration::days(1);
        let e = event("a", "m1", tuesday, EventKind::Created, true);
        assert_eq!(apply_event(&mut state, &config, &e, tuesday), TrackOutcome::Recorded);
        assert!(state.attendance.attended("a", today()));
        assert!(!state.attendance.attended("a", today().succ_opt().unwrap()));
    }

    #[test]
    fn deleting_buffered_message_drops_it() {
        let config = WorkspaceConfig::default();
        let mut state = WorkspaceState::default();
        let now = at(7, 30, 0);
        apply_event(&mut state, &config, &event("a", "m1", at(7, 10, 0), EventKind::Created, true), now);
        let delete = event("a", "m1", at(7, 10, 0), EventKind::Deleted, false);
        assert_eq!(apply_event(&mut state, &config, &delete, now), TrackOutcome::Buffered);
        assert!(state.early_events.is_empty());

        state.session = Some(SessionState::new(at(9, 0, 0), today(), Duration::minutes(735), false));
        assert_eq!(replay_buffered(&mut state, &config), 0);
    }

    #[test]
    fn stale_message_is_not_buffered() {
        let config = WorkspaceConfig::default();
        let mut state = WorkspaceState::default();
        let old = event("a", "m1", at(9, 0, 0) - Duration::days(3), EventKind::Created, true);
        assert_eq!(
            apply_event(&mut state, &config, &old, at(9, 0, 0)),
            TrackOutcome::Ignored(IgnoreReason::Stale)
        );
    }
}
