use crate::output::print_json;
use chrono::Utc;
use standup_core::Actor;
use std::path::Path;

pub fn run(root: &Path, workspace: &str, json: bool) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    let rt = super::runtime()?;
    let session = rt.block_on(engine.open_now(workspace, Actor::Operator, Utc::now()))?;

    if json {
        return print_json(&session);
    }
    println!("Opened standup for {workspace}");
    println!("  session:  {}", session.id());
    println!("  date:     {}", session.local_date);
    println!("  deadline: {}", session.deadline_at.to_rfc3339());
    if let Some(display) = &session.summary_display_ref {
        println!("  display:  {display}");
    }
    if !session.participation.is_empty() {
        let members: Vec<&str> = session.participation.keys().map(String::as_str).collect();
        println!("  already posted: {}", members.join(", "));
    }
    Ok(())
}
