use crate::output::{print_json, print_table};
use chrono::Utc;
use clap::Subcommand;
use standup_core::calendar::HolidayCalendar;
use standup_core::lifecycle::next_open;
use standup_core::{ConfigPatch, WorkspaceConfig, WorkspaceStore};
use std::path::Path;

/// Local config edits are trusted: the admin list guards chat and HTTP
/// callers, not the operator holding the database file.
#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show a workspace's configuration (created with defaults if new)
    Show { workspace: String },

    /// List every configured workspace
    List,

    /// Change scalar settings
    Set {
        workspace: String,
        /// Local open time, HH:MM
        #[arg(long)]
        trigger_time: Option<String>,
        /// IANA timezone, e.g. Asia/Manila
        #[arg(long)]
        timezone: Option<String>,
        /// Channel webhook URL; pass an empty string to clear
        #[arg(long)]
        channel: Option<String>,
        /// How far before the open instant messages still count, 0-24
        #[arg(long)]
        lookback_hours: Option<u32>,
    },

    /// Stop tracking members
    Exclude {
        workspace: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Resume tracking previously excluded members
    Include {
        workspace: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Grant or revoke admin rights
    Admin {
        workspace: String,
        #[arg(required = true)]
        members: Vec<String>,
        #[arg(long)]
        remove: bool,
    },

    /// Add or remove expected participants
    Member {
        workspace: String,
        #[arg(required = true)]
        members: Vec<String>,
        #[arg(long)]
        remove: bool,
    },

    /// Mark or unmark non-working dates (YYYY-MM-DD)
    Skip {
        workspace: String,
        #[arg(required = true)]
        dates: Vec<String>,
        #[arg(long)]
        remove: bool,
    },
}

pub fn run(root: &Path, subcommand: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    let (settings, store) = super::open_store(root)?;

    let (workspace, patch) = match subcommand {
        ConfigSubcommand::Show { workspace } => {
            let config = store.get_config(&workspace)?;
            return show(&workspace, &config, &settings.holidays, json);
        }
        ConfigSubcommand::List => {
            let workspaces = store.list_workspaces()?;
            if json {
                return print_json(&workspaces);
            }
            if workspaces.is_empty() {
                println!("No workspaces configured.");
            }
            for ws in workspaces {
                println!("{ws}");
            }
            return Ok(());
        }
        ConfigSubcommand::Set {
            workspace,
            trigger_time,
            timezone,
            channel,
            lookback_hours,
        } => {
            let patch = ConfigPatch {
                trigger_time,
                timezone,
                target_channel: channel,
                lookback_hours,
                ..ConfigPatch::default()
            };
            if patch.is_empty() {
                anyhow::bail!(
                    "nothing to change: pass --trigger-time, --timezone, --channel or --lookback-hours"
                );
            }
            (workspace, patch)
        }
        ConfigSubcommand::Exclude { workspace, members } => (
            workspace,
            ConfigPatch {
                exclude: members,
                ..ConfigPatch::default()
            },
        ),
        ConfigSubcommand::Include { workspace, members } => (
            workspace,
            ConfigPatch {
                include: members,
                ..ConfigPatch::default()
            },
        ),
        ConfigSubcommand::Admin {
            workspace,
            members,
            remove,
        } => {
            let mut patch = ConfigPatch::default();
            if remove {
                patch.remove_admins = members;
            } else {
                patch.add_admins = members;
            }
            (workspace, patch)
        }
        ConfigSubcommand::Member {
            workspace,
            members,
            remove,
        } => {
            let mut patch = ConfigPatch::default();
            if remove {
                patch.remove_members = members;
            } else {
                patch.add_members = members;
            }
            (workspace, patch)
        }
        ConfigSubcommand::Skip {
            workspace,
            dates,
            remove,
        } => {
            let mut patch = ConfigPatch::default();
            if remove {
                patch.remove_skip_dates = dates;
            } else {
                patch.add_skip_dates = dates;
            }
            (workspace, patch)
        }
    };

    let config = store.update_config(&workspace, &patch)?;
    tracing::info!(workspace = %workspace, "config updated from cli");
    show(&workspace, &config, &settings.holidays, json)
}

fn show(
    workspace: &str,
    config: &WorkspaceConfig,
    holidays: &HolidayCalendar,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(config);
    }
    let join = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let skips: std::collections::BTreeSet<String> = config
        .manual_skip_dates
        .iter()
        .map(|d| d.to_string())
        .collect();
    let rows = vec![
        vec!["workspace".into(), workspace.to_string()],
        vec!["timezone".into(), config.timezone.clone()],
        vec!["trigger_time".into(), config.trigger_time.to_string()],
        vec![
            "channel".into(),
            config.target_channel.clone().unwrap_or_else(|| "-".into()),
        ],
        vec!["lookback_hours".into(), config.lookback_hours.to_string()],
        vec!["members".into(), join(&config.members)],
        vec!["excluded".into(), join(&config.excluded_members)],
        vec!["admins".into(), join(&config.admin_members)],
        vec!["skip_dates".into(), join(&skips)],
        vec![
            "next_open".into(),
            next_open(Utc::now(), config, holidays)
                .map(|t| t.with_timezone(&config.tz()).format("%a %Y-%m-%d %H:%M %Z").to_string())
                .unwrap_or_else(|| "-".into()),
        ],
    ];
    print_table(&["FIELD", "VALUE"], rows);
    Ok(())
}
