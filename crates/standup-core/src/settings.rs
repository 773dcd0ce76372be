use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::calendar::HolidayCalendar;
use crate::error::{Result, StandupError};
use crate::paths;

// ---------------------------------------------------------------------------
// ScheduleSettings
// ---------------------------------------------------------------------------

/// Timing constants shared by every workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// `deadline_at = opened_at + deadline_offset_minutes`.
    #[serde(default = "default_deadline_offset")]
    pub deadline_offset_minutes: i64,
    #[serde(default = "default_pre_reminder")]
    pub pre_reminder_minutes: i64,
    #[serde(default = "default_post_reminder_delay")]
    pub post_reminder_delay_minutes: i64,
    #[serde(default = "default_ping_pending")]
    pub ping_pending_after_deadline: bool,
}

fn default_tick_interval() -> u64 {
    60
}

fn default_deadline_offset() -> i64 {
    12 * 60 + 15
}

fn default_pre_reminder() -> i64 {
    15
}

fn default_post_reminder_delay() -> i64 {
    1
}

fn default_ping_pending() -> bool {
    true
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            deadline_offset_minutes: default_deadline_offset(),
            pre_reminder_minutes: default_pre_reminder(),
            post_reminder_delay_minutes: default_post_reminder_delay(),
            ping_pending_after_deadline: default_ping_pending(),
        }
    }
}

impl ScheduleSettings {
    pub fn deadline_offset(&self) -> Duration {
        Duration::minutes(self.deadline_offset_minutes)
    }

    pub fn pre_reminder_lead(&self) -> Duration {
        Duration::minutes(self.pre_reminder_minutes)
    }

    pub fn post_reminder_delay(&self) -> Duration {
        Duration::minutes(self.post_reminder_delay_minutes)
    }

    /// Width of the window in which a time-based trigger counts as "now".
    /// Matches the tick interval so each trigger point is seen by exactly
    /// one tick.
    pub fn tolerance(&self) -> Duration {
        Duration::seconds(self.tick_interval_secs.max(1) as i64)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs.max(1))
    }
}

// ---------------------------------------------------------------------------
// Settings (top-level)
// ---------------------------------------------------------------------------

/// Service settings read from `.standup/standup.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Database file; relative paths resolve against the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub holidays: HolidayCalendar,
}

fn default_version() -> u32 {
    1
}

fn default_listen() -> String {
    "0.0.0.0:3141".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: None,
            listen: default_listen(),
            schedule: ScheduleSettings::default(),
            holidays: HolidayCalendar::default(),
        }
    }
}

impl Settings {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::settings_path(root);
        if !path.exists() {
            return Err(StandupError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::settings_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        match &self.database {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => root.join(p),
            None => paths::database_path(root),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
