use crate::output::print_json;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::Path;

/// One scheduler pass, for cron-driven deployments and for checking what
/// the service would do at a given instant.
pub fn run(root: &Path, at: Option<&str>, json: bool) -> anyhow::Result<()> {
    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --at '{raw}': expected RFC 3339"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let engine = super::open_engine(root)?;
    let rt = super::runtime()?;
    let report = rt.block_on(engine.tick(now));

    if json {
        print_json(&report)?;
    } else {
        println!(
            "tick at {}: {} workspace(s)",
            now.to_rfc3339(),
            report.workspaces
        );
        for (label, list) in [
            ("reminded", &report.pre_reminders),
            ("opened", &report.opened),
            ("deadline", &report.closed),
            ("failed", &report.failed),
        ] {
            if !list.is_empty() {
                println!("  {label:<9} {}", list.join(", "));
            }
        }
    }

    if !report.failed.is_empty() {
        anyhow::bail!("{} workspace(s) failed; see log output", report.failed.len());
    }
    Ok(())
}
