use standup_core::Settings;
use std::path::Path;

pub fn run(root: &Path, listen: Option<String>) -> anyhow::Result<()> {
    let mut settings = Settings::load(root)?;
    if let Some(addr) = listen {
        settings.listen = addr;
    }
    let rt = super::runtime()?;
    rt.block_on(standup_server::serve(root, settings))
}
