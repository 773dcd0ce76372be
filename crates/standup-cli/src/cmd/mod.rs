pub mod config;
pub mod init;
pub mod open;
pub mod serve;
pub mod summary;
pub mod tick;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use standup_core::{Engine, Settings, StandupDb};
use standup_server::webhook::WebhookTransport;

/// Load settings and open the workspace database under `root`.
///
/// redb holds an exclusive lock on the file, so these commands fail while
/// `standup serve` is running against the same root.
pub fn open_store(root: &Path) -> anyhow::Result<(Settings, Arc<StandupDb>)> {
    let settings = Settings::load(root)?;
    let db_path = settings.database_path(root);
    let db = StandupDb::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    Ok((settings, Arc::new(db)))
}

/// Engine wired to the real webhook transport.
pub fn open_engine(root: &Path) -> anyhow::Result<Engine> {
    let (settings, store) = open_store(root)?;
    let transport = Arc::new(WebhookTransport::new()?);
    Ok(Engine::from_settings(store, transport, &settings))
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}
