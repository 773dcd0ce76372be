use crate::output::print_json;
use chrono::Utc;
use std::path::Path;

pub fn run(root: &Path, workspace: &str, json: bool) -> anyhow::Result<()> {
    let engine = super::open_engine(root)?;
    let rt = super::runtime()?;
    let Some(document) = rt.block_on(engine.summary(workspace, Utc::now()))? else {
        anyhow::bail!("no standup session has been opened for '{workspace}' yet");
    };

    if json {
        print_json(&document)
    } else {
        println!("{}", document.to_markdown());
        Ok(())
    }
}
