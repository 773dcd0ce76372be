use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::calendar;
use crate::error::{Result, StandupError};
use crate::paths::validate_id;

pub type MemberId = String;

// ---------------------------------------------------------------------------
// TriggerTime
// ---------------------------------------------------------------------------

/// Local wall-clock time at which the daily session opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerTime {
    pub hour: u32,
    pub minute: u32,
}

impl TriggerTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(StandupError::InvalidTriggerTime(format!(
                "{hour:02}:{minute:02}"
            )));
        }
        Ok(Self { hour, minute })
    }

    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for TriggerTime {
    fn default() -> Self {
        Self { hour: 9, minute: 0 }
    }
}

impl fmt::Display for TriggerTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TriggerTime {
    type Err = StandupError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StandupError::InvalidTriggerTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl Serialize for TriggerTime {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TriggerTime {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Who is asking for an admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor<'a> {
    /// Local operator with direct access to the database.
    Operator,
    /// A chat member identified by the caller.
    Member(&'a str),
    /// A remote caller that did not say who it acts for.
    Anonymous,
}

// ---------------------------------------------------------------------------
// WorkspaceConfig
// ---------------------------------------------------------------------------

/// Upper bound for `lookback_hours`. Zero means only messages posted after
/// the open count.
pub const MAX_LOOKBACK_HOURS: u32 = 24;

/// Per-workspace settings, created with defaults on first contact and
/// changed only through [`WorkspaceConfig::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub trigger_time: TriggerTime,
    /// Where sessions are posted. For the webhook transport this is the
    /// incoming-webhook URL of the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_channel: Option<String>,
    #[serde(default)]
    pub excluded_members: BTreeSet<MemberId>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    #[serde(default)]
    pub manual_skip_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub admin_members: BTreeSet<MemberId>,
    /// Members expected to take part every day.
    #[serde(default)]
    pub members: BTreeSet<MemberId>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_lookback_hours() -> u32 {
    2
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            trigger_time: TriggerTime::default(),
            target_channel: None,
            excluded_members: BTreeSet::new(),
            lookback_hours: default_lookback_hours(),
            manual_skip_dates: BTreeSet::new(),
            admin_members: BTreeSet::new(),
            members: BTreeSet::new(),
        }
    }
}

impl WorkspaceConfig {
    pub fn tz(&self) -> Tz {
        calendar::resolve_timezone(&self.timezone)
    }

    pub fn lookback(&self) -> Duration {
        Duration::hours(self.lookback_hours as i64)
    }

    pub fn is_excluded(&self, member: &str) -> bool {
        self.excluded_members.contains(member)
    }

    /// Roster plus anyone in `extra` (e.g. current participants), minus
    /// excluded members.
    pub fn eligible_members<'a>(
        &'a self,
        extra: impl IntoIterator<Item = &'a MemberId>,
    ) -> BTreeSet<MemberId> {
        self.members
            .iter()
            .chain(extra)
            .filter(|m| !self.is_excluded(m))
            .cloned()
            .collect()
    }

    /// Check that `actor` may change this workspace. Workspaces without any
    /// admin are open to everyone.
    pub fn authorize(&self, actor: Actor<'_>) -> Result<()> {
        if self.admin_members.is_empty() {
            return Ok(());
        }
        match actor {
            Actor::Operator => Ok(()),
            Actor::Member(member) if self.admin_members.contains(member) => Ok(()),
            Actor::Member(member) => Err(StandupError::NotAuthorized(member.to_string())),
            Actor::Anonymous => Err(StandupError::NotAuthorized("anonymous caller".into())),
        }
    }

    /// Apply `patch`, validating every field first. On error nothing is
    /// changed.
    pub fn apply(&mut self, patch: &ConfigPatch) -> Result<()> {
        let mut next = self.clone();

        if let Some(raw) = &patch.trigger_time {
            next.trigger_time = raw.parse()?;
        }
        if let Some(tz) = &patch.timezone {
            if !calendar::is_valid_timezone(tz) {
                return Err(StandupError::InvalidTimezone(tz.clone()));
            }
            next.timezone = tz.clone();
        }
        if let Some(channel) = &patch.target_channel {
            let channel = channel.trim();
            next.target_channel = (!channel.is_empty()).then(|| channel.to_string());
        }
        if let Some(hours) = patch.lookback_hours {
            if hours > MAX_LOOKBACK_HOURS {
                return Err(StandupError::InvalidLookback(hours));
            }
            next.lookback_hours = hours;
        }

        for id in patch
            .exclude
            .iter()
            .chain(&patch.include)
            .chain(&patch.add_admins)
            .chain(&patch.remove_admins)
            .chain(&patch.add_members)
            .chain(&patch.remove_members)
        {
            validate_id(id)?;
        }
        next.excluded_members.extend(patch.exclude.iter().cloned());
        for id in &patch.include {
            next.excluded_members.remove(id);
        }
        next.admin_members.extend(patch.add_admins.iter().cloned());
        for id in &patch.remove_admins {
            next.admin_members.remove(id);
        }
        next.members.extend(patch.add_members.iter().cloned());
        for id in &patch.remove_members {
            next.members.remove(id);
        }

        for raw in &patch.add_skip_dates {
            next.manual_skip_dates.insert(parse_date(raw)?);
        }
        for raw in &patch.remove_skip_dates {
            next.manual_skip_dates.remove(&parse_date(raw)?);
        }

        *self = next;
        Ok(())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| StandupError::InvalidDate(raw.to_string()))
}

// ---------------------------------------------------------------------------
// ConfigPatch
// ---------------------------------------------------------------------------

/// A partial update to a [`WorkspaceConfig`]. Raw strings are validated
/// when the patch is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// An empty string clears the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_admins: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_admins: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_members: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_members: Vec<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_skip_dates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_skip_dates: Vec<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
