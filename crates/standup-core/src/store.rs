//! Per-workspace persistence.
//!
//! # Table design
//!
//! Two redb tables, both keyed by workspace id with a JSON document value:
//! ```text
//! configs : workspace_id -> WorkspaceConfig
//! states  : workspace_id -> WorkspaceState
//! ```
//!
//! Every write replaces the whole document in one transaction, so a reader
//! never observes a half-applied session reset. Callers serialize
//! read-modify-write cycles per workspace (see [`crate::engine::Engine`]).

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::config::{ConfigPatch, WorkspaceConfig};
use crate::error::{Result, StandupError};
use crate::paths::validate_id;
use crate::session::WorkspaceState;

const CONFIGS: TableDefinition<&str, &[u8]> = TableDefinition::new("configs");
const STATES: TableDefinition<&str, &[u8]> = TableDefinition::new("states");

pub trait WorkspaceStore: Send + Sync {
    /// The workspace's config. Defaults are created and stored on first
    /// access.
    fn get_config(&self, workspace: &str) -> Result<WorkspaceConfig>;

    fn put_config(&self, workspace: &str, config: &WorkspaceConfig) -> Result<()>;

    /// Runtime state; an unknown workspace has an empty state.
    fn get_state(&self, workspace: &str) -> Result<WorkspaceState>;

    fn put_state(&self, workspace: &str, state: &WorkspaceState) -> Result<()>;

    /// Every workspace with a stored config, in id order.
    fn list_workspaces(&self) -> Result<Vec<String>>;

    /// Validate and apply `patch`, then store the result.
    fn update_config(&self, workspace: &str, patch: &ConfigPatch) -> Result<WorkspaceConfig> {
        let mut config = self.get_config(workspace)?;
        config.apply(patch)?;
        self.put_config(workspace, &config)?;
        Ok(config)
    }
}

fn store_err(e: impl std::fmt::Display) -> StandupError {
    StandupError::Store(e.to_string())
}

// ---------------------------------------------------------------------------
// StandupDb
// ---------------------------------------------------------------------------

/// redb-backed [`WorkspaceStore`].
pub struct StandupDb {
    db: Database,
}

impl StandupDb {
    /// Open or create the database at `path`, creating both tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(CONFIGS).map_err(store_err)?;
        wt.open_table(STATES).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    fn read(&self, table: TableDefinition<&str, &[u8]>, key: &str) -> Result<Option<Vec<u8>>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(table).map_err(store_err)?;
        let value = table.get(key).map_err(store_err)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn write(&self, table: TableDefinition<&str, &[u8]>, key: &str, value: &[u8]) -> Result<()> {
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = wt.open_table(table).map_err(store_err)?;
            table.insert(key, value).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }
}

impl WorkspaceStore for StandupDb {
    fn get_config(&self, workspace: &str) -> Result<WorkspaceConfig> {
        validate_id(workspace)?;
        match self.read(CONFIGS, workspace)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                let config = WorkspaceConfig::default();
                self.put_config(workspace, &config)?;
                tracing::info!(workspace, "created default workspace config");
                Ok(config)
            }
        }
    }

    fn put_config(&self, workspace: &str, config: &WorkspaceConfig) -> Result<()> {
        validate_id(workspace)?;
        self.write(CONFIGS, workspace, &serde_json::to_vec(config)?)
    }

    fn get_state(&self, workspace: &str) -> Result<WorkspaceState> {
        validate_id(workspace)?;
        match self.read(STATES, workspace)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(WorkspaceState::default()),
        }
    }

    fn put_state(&self, workspace: &str, state: &WorkspaceState) -> Result<()> {
        validate_id(workspace)?;
        self.write(STATES, workspace, &serde_json::to_vec(state)?)
    }

    fn list_workspaces(&self) -> Result<Vec<String>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(CONFIGS).map_err(store_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (k, _) = entry.map_err(store_err)?;
            out.push(k.value().to_string());
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, StandupDb) {
        let dir = TempDir::new().unwrap();
        let db = StandupDb::open(&dir.path().join("nested/standup.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn first_access_creates_default_config() {
        let (_dir, db) = open_tmp();
        assert!(db.list_workspaces().unwrap().is_empty());
        let config = db.get_config("guild-1").unwrap();
        assert_eq!(config, WorkspaceConfig::default());
        assert_eq!(db.list_workspaces().unwrap(), vec!["guild-1".to_string()]);
    }

    #[test]
    fn state_round_trips() {
        let (_dir, db) = open_tmp();
        assert_eq!(db.get_state("g").unwrap(), WorkspaceState::default());

        let opened = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut state = WorkspaceState {
            session: Some(SessionState::new(opened, date, Duration::minutes(735), false)),
            ..Default::default()
        };
        state.attendance.mark("alice", date);
        state.ledger.last_opened_on = Some(date);
        db.put_state("g", &state).unwrap();
        assert_eq!(db.get_state("g").unwrap(), state);
    }

    #[test]
    fn update_config_rejects_invalid_patch() {
        let (_dir, db) = open_tmp();
        let err = db
            .update_config(
                "g",
                &ConfigPatch {
                    trigger_time: Some("25:00".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(db.get_config("g").unwrap().trigger_time.to_string(), "09:00");

        let updated = db
            .update_config(
                "g",
                &ConfigPatch {
                    trigger_time: Some("08:30".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.trigger_time.to_string(), "08:30");
        assert_eq!(db.get_config("g").unwrap(), updated);
    }

    #[test]
    fn invalid_workspace_id_rejected() {
        let (_dir, db) = open_tmp();
        assert!(matches!(
            db.get_config("../etc"),
            Err(StandupError::InvalidId(_))
        ));
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("standup.db");
        {
            let db = StandupDb::open(&path).unwrap();
            db.update_config(
                "g",
                &ConfigPatch {
                    add_members: vec!["alice".into()],
                    ..Default::default()
                },
            )
            .unwrap();
        }
        let db = StandupDb::open(&path).unwrap();
        assert!(db.get_config("g").unwrap().members.contains("alice"));
    }
}
