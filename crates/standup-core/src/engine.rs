//! The standup engine.
//!
//! Owns the store and the transport and serializes every read-modify-write
//! of one workspace's state behind a per-workspace async mutex. Different
//! workspaces proceed concurrently; a failure in one never stops the tick
//! for the others.
//!
//! All operations take `now` explicitly. [`Engine::run`] feeds them the wall
//! clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::calendar::HolidayCalendar;
use crate::config::{Actor, ConfigPatch, WorkspaceConfig};
use crate::error::{Result, StandupError};
use crate::lifecycle::{self, OpenDecision};
use crate::reminder;
use crate::render::{self, SummaryDocument};
use crate::session::{InboundEvent, SessionState, WorkspaceState};
use crate::settings::{ScheduleSettings, Settings};
use crate::store::WorkspaceStore;
use crate::tracker::{self, TrackOutcome};
use crate::transport::{Transport, TransportError};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What one tick did to one workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkspaceTick {
    pub pre_reminder: bool,
    pub opened: bool,
    pub post_deadline: bool,
    pub display_repaired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub at: Option<DateTime<Utc>>,
    pub workspaces: usize,
    pub pre_reminders: Vec<String>,
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    pub failed: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    store: Arc<dyn WorkspaceStore>,
    transport: Arc<dyn Transport>,
    schedule: ScheduleSettings,
    holidays: HolidayCalendar,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        transport: Arc<dyn Transport>,
        schedule: ScheduleSettings,
        holidays: HolidayCalendar,
    ) -> Self {
        Self {
            store,
            transport,
            schedule,
            holidays,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(
        store: Arc<dyn WorkspaceStore>,
        transport: Arc<dyn Transport>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            store,
            transport,
            settings.schedule.clone(),
            settings.holidays.clone(),
        )
    }

    fn workspace_lock(&self, workspace: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(workspace.to_string()).or_default())
    }

    /// Run a synchronous store call off the async executor.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn WorkspaceStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| StandupError::Store(format!("store task failed: {e}")))?
    }

    async fn load(&self, workspace: &str) -> Result<(WorkspaceConfig, WorkspaceState)> {
        let ws = workspace.to_string();
        self.with_store(move |s| Ok((s.get_config(&ws)?, s.get_state(&ws)?)))
            .await
    }

    async fn save_state(&self, workspace: &str, state: &WorkspaceState) -> Result<()> {
        let ws = workspace.to_string();
        let state = state.clone();
        self.with_store(move |s| s.put_state(&ws, &state)).await
    }

    fn render(
        &self,
        config: &WorkspaceConfig,
        state: &WorkspaceState,
        session: &SessionState,
        now: DateTime<Utc>,
    ) -> SummaryDocument {
        render::render(
            config,
            session,
            &state.attendance,
            &state.last_outstanding,
            &self.holidays,
            now,
        )
    }

    /// Push the current session into its display. On failure the session is
    /// marked stale so the next tick or event retries.
    async fn refresh_display(
        &self,
        workspace: &str,
        config: &WorkspaceConfig,
        state: &mut WorkspaceState,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), TransportError> {
        let Some(session) = state.session.as_ref() else {
            return Ok(());
        };
        let document = self.render(config, state, session, now);
        let current_ref = session.summary_display_ref.clone();

        let result = match &config.target_channel {
            Some(channel) => {
                self.transport
                    .upsert_display(channel, current_ref.as_deref(), &document)
                    .await
            }
            None => Err(TransportError::Request(format!(
                "no channel configured for workspace {workspace}"
            ))),
        };

        let Some(session) = state.session.as_mut() else {
            return Ok(());
        };
        match result {
            Ok(display_ref) => {
                if current_ref.as_deref() != Some(display_ref.as_str()) {
                    tracing::info!(workspace, display = %display_ref, "summary display replaced");
                }
                session.summary_display_ref = Some(display_ref);
                session.display_stale = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(workspace, error = %e, "summary refresh failed; will retry");
                session.display_stale = true;
                Err(e)
            }
        }
    }

    /// Open a session and post its display. Nothing is persisted unless the
    /// display post succeeds.
    async fn open_session(
        &self,
        workspace: &str,
        config: &WorkspaceConfig,
        state: &WorkspaceState,
        now: DateTime<Utc>,
        manual: bool,
    ) -> Result<WorkspaceState> {
        let channel = config
            .target_channel
            .as_deref()
            .ok_or_else(|| StandupError::NoChannel(workspace.to_string()))?;
        let local_date = lifecycle::local_date(now, config);
        let mut next =
            lifecycle::prepare_open(state, config, now, local_date, &self.schedule, manual);

        let Some(session) = next.session.as_ref() else {
            return Err(StandupError::Store("prepared state has no session".into()));
        };
        let document = self.render(config, &next, session, now);
        let display_ref = self
            .transport
            .upsert_display(channel, None, &document)
            .await?;

        if let Some(session) = next.session.as_mut() {
            session.summary_display_ref = Some(display_ref);
            tracing::info!(
                workspace,
                session = %session.id(),
                participants = session.participation.len(),
                manual,
                "standup session opened"
            );
        }
        self.save_state(workspace, &next).await?;
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Drive every known workspace once.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let workspaces = match self.with_store(|s| s.list_workspaces()).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!(error = %e, "failed to list workspaces");
                return TickReport {
                    at: Some(now),
                    ..Default::default()
                };
            }
        };

        let results = futures::future::join_all(
            workspaces
                .iter()
                .map(|ws| async move { (ws, self.tick_workspace(ws, now).await) }),
        )
        .await;

        let mut report = TickReport {
            at: Some(now),
            workspaces: workspaces.len(),
            ..Default::default()
        };
        for (ws, result) in results {
            match result {
                Ok(t) => {
                    if t.pre_reminder {
                        report.pre_reminders.push(ws.clone());
                    }
                    if t.opened {
                        report.opened.push(ws.clone());
                    }
                    if t.post_deadline {
                        report.closed.push(ws.clone());
                    }
                }
                Err(e) => {
                    tracing::error!(workspace = %ws, error = %e, "tick failed for workspace");
                    report.failed.push(ws.clone());
                }
            }
        }
        report
    }

    pub async fn tick_workspace(&self, workspace: &str, now: DateTime<Utc>) -> Result<WorkspaceTick> {
        let lock = self.workspace_lock(workspace);
        let _guard = lock.lock().await;

        let (config, mut state) = self.load(workspace).await?;
        let mut report = WorkspaceTick::default();

        if let Some(date) =
            reminder::pre_open_due(now, &config, &state, &self.holidays, &self.schedule)
        {
            if let Some(channel) = &config.target_channel {
                let text = reminder::pre_open_text(date, &config, &self.schedule);
                match self.transport.post_announcement(channel, &text).await {
                    Ok(()) => {
                        state.ledger.pre_reminder_on = Some(date);
                        self.save_state(workspace, &state).await?;
                        report.pre_reminder = true;
                        tracing::info!(workspace, %date, "pre-open reminder sent");
                    }
                    Err(e) => {
                        tracing::warn!(workspace, error = %e, "pre-open reminder failed");
                    }
                }
            }
        }

        match lifecycle::decide_open(now, &config, &state, &self.holidays, &self.schedule) {
            OpenDecision::Open { local_date } if config.target_channel.is_some() => {
                match self.open_session(workspace, &config, &state, now, false).await {
                    Ok(next) => {
                        state = next;
                        report.opened = true;
                    }
                    Err(e) => {
                        tracing::warn!(workspace, error = %e, "session open failed; retrying next tick");
                        state.ledger.open_retry_on = Some(local_date);
                        self.save_state(workspace, &state).await?;
                        return Err(e);
                    }
                }
            }
            OpenDecision::Open { .. } => {
                tracing::debug!(workspace, "trigger reached but no channel configured");
            }
            OpenDecision::Idle(reason) => {
                tracing::trace!(workspace, ?reason, "no session to open");
            }
        }

        if reminder::post_deadline_due(now, &config, &state, &self.holidays, &self.schedule) {
            // Display failures only mark the session stale; the reminder still goes out.
            let _ = self.refresh_display(workspace, &config, &mut state, now).await;
            if let Some(session) = &state.session {
                let ping = self
                    .schedule
                    .ping_pending_after_deadline
                    .then(|| reminder::post_deadline_text(&config, session))
                    .flatten();
                let sent = match (ping, &config.target_channel) {
                    (Some(text), Some(channel)) => {
                        match self.transport.post_announcement(channel, &text).await {
                            Ok(()) => true,
                            Err(e) => {
                                tracing::warn!(workspace, error = %e, "post-deadline reminder failed; retrying next tick");
                                false
                            }
                        }
                    }
                    _ => true,
                };
                // Left open on failure so a later tick in the window retries.
                if sent {
                    state.ledger.closed_session = Some(session.opened_at);
                    report.post_deadline = true;
                    tracing::info!(workspace, session = %session.id(), "standup deadline passed");
                }
            }
            self.save_state(workspace, &state).await?;
        } else if state.session.as_ref().is_some_and(|s| s.display_stale) {
            report.display_repaired = self
                .refresh_display(workspace, &config, &mut state, now)
                .await
                .is_ok();
            self.save_state(workspace, &state).await?;
        }

        Ok(report)
    }

    /// Tick forever at the configured interval.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.schedule.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.schedule.tick_interval_secs,
            "standup scheduler started"
        );
        loop {
            interval.tick().await;
            let report = self.tick(Utc::now()).await;
            tracing::debug!(
                workspaces = report.workspaces,
                opened = report.opened.len(),
                failed = report.failed.len(),
                "tick complete"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Open a session immediately, ignoring the trigger time and the
    /// workday calendar. Supersedes any session already open today.
    pub async fn open_now(
        &self,
        workspace: &str,
        actor: Actor<'_>,
        now: DateTime<Utc>,
    ) -> Result<SessionState> {
        let lock = self.workspace_lock(workspace);
        let _guard = lock.lock().await;

        let (config, state) = self.load(workspace).await?;
        config.authorize(actor)?;
        let next = self.open_session(workspace, &config, &state, now, true).await?;
        next.session
            .ok_or_else(|| StandupError::Store("opened state has no session".into()))
    }

    /// Apply one inbound message event.
    pub async fn deliver_event(
        &self,
        workspace: &str,
        event: &InboundEvent,
        now: DateTime<Utc>,
    ) -> Result<TrackOutcome> {
        crate::paths::validate_id(&event.member)?;
        let lock = self.workspace_lock(workspace);
        let _guard = lock.lock().await;

        let (config, mut state) = self.load(workspace).await?;
        let outcome = tracker::apply_event(&mut state, &config, event, now);
        tracing::debug!(workspace, member = %event.member, ?outcome, "event applied");

        let stale = state.session.as_ref().is_some_and(|s| s.display_stale);
        let mut dirty = outcome.is_mutation();
        if outcome.needs_render() || stale {
            let refreshed = self
                .refresh_display(workspace, &config, &mut state, now)
                .await
                .is_ok();
            dirty |= refreshed;
        }
        if dirty {
            self.save_state(workspace, &state).await?;
        }
        Ok(outcome)
    }

    /// Re-render the active session into its display. `Ok(None)` when no
    /// session has been opened yet.
    pub async fn refresh(
        &self,
        workspace: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SummaryDocument>> {
        let lock = self.workspace_lock(workspace);
        let _guard = lock.lock().await;

        let (config, mut state) = self.load(workspace).await?;
        if state.session.is_none() {
            return Ok(None);
        }
        let result = self.refresh_display(workspace, &config, &mut state, now).await;
        self.save_state(workspace, &state).await?;
        result?;
        Ok(state
            .session
            .as_ref()
            .map(|s| self.render(&config, &state, s, now)))
    }

    /// Render the active session without touching the display.
    pub async fn summary(
        &self,
        workspace: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SummaryDocument>> {
        let (config, state) = self.load(workspace).await?;
        Ok(state
            .session
            .as_ref()
            .map(|s| self.render(&config, &state, s, now)))
    }

    pub async fn state(&self, workspace: &str) -> Result<WorkspaceState> {
        Ok(self.load(workspace).await?.1)
    }

    pub async fn config(&self, workspace: &str) -> Result<WorkspaceConfig> {
        Ok(self.load(workspace).await?.0)
    }

    /// Validate and apply a config change requested by `actor`. The active
    /// display is refreshed so exclusions and roster changes show at once.
    pub async fn configure(
        &self,
        workspace: &str,
        actor: Actor<'_>,
        patch: &ConfigPatch,
        now: DateTime<Utc>,
    ) -> Result<WorkspaceConfig> {
        let lock = self.workspace_lock(workspace);
        let _guard = lock.lock().await;

        let (current, mut state) = self.load(workspace).await?;
        current.authorize(actor)?;
        let ws = workspace.to_string();
        let patch_owned = patch.clone();
        let config = self
            .with_store(move |s| s.update_config(&ws, &patch_owned))
            .await?;
        tracing::info!(workspace, "workspace config updated");

        if state.session.is_some() {
            let _ = self.refresh_display(workspace, &config, &mut state, now).await;
            self.save_state(workspace, &state).await?;
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
