use anyhow::Context;
use standup_core::{io, paths, Settings, StandupDb};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing standup in: {}", root.display());

    let dir = paths::standup_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let settings = if paths::settings_path(root).exists() {
        println!("  exists:  {}", paths::SETTINGS_FILE);
        Settings::load(root)?
    } else {
        let settings = Settings::default();
        settings
            .save(root)
            .context("failed to write standup.yaml")?;
        println!("  created: {}", paths::SETTINGS_FILE);
        settings
    };

    let db_path = settings.database_path(root);
    let existed = db_path.exists();
    StandupDb::open(&db_path).with_context(|| format!("failed to open {}", db_path.display()))?;
    let label = db_path
        .strip_prefix(root)
        .unwrap_or(&db_path)
        .display()
        .to_string();
    if existed {
        println!("  exists:  {label}");
    } else {
        println!("  created: {label}");
    }

    println!("\nNext: standup config set <workspace> --channel <webhook-url>");
    Ok(())
}
