use crate::error::{Result, StandupError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STANDUP_DIR: &str = ".standup";
pub const SETTINGS_FILE: &str = ".standup/standup.yaml";
pub const DATABASE_FILE: &str = ".standup/standup.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn standup_dir(root: &Path) -> PathBuf {
    root.join(STANDUP_DIR)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap())
}

/// Workspace and member ids come from the chat platform (snowflakes, slugs).
/// They end up in redb keys and URL paths, so only a conservative alphabet
/// is accepted.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(StandupError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_ids() {
        for id in ["1234567890", "team-alpha", "U_01", "x"] {
            validate_id(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_ids() {
        let long = "a".repeat(65);
        for id in ["", "has spaces", "<@123>", "a/b", long.as_str()] {
            assert!(validate_id(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/srv/bot");
        assert_eq!(
            settings_path(root),
            PathBuf::from("/srv/bot/.standup/standup.yaml")
        );
        assert_eq!(
            database_path(root),
            PathBuf::from("/srv/bot/.standup/standup.db")
        );
    }
}
