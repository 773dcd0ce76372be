use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum StandupError {
    #[error("not initialized: run 'standup init'")]
    NotInitialized,

    #[error("unknown timezone '{0}': expected an IANA name such as 'Asia/Manila'")]
    InvalidTimezone(String),

    #[error("invalid trigger time '{0}': expected HH:MM (24-hour)")]
    InvalidTriggerTime(String),

    #[error("invalid lookback of {0} hours: must be at most 24")]
    InvalidLookback(u32),

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid id '{0}': must be 1-64 characters of [A-Za-z0-9_-]")]
    InvalidId(String),

    #[error("{0} is not an admin of this workspace")]
    NotAuthorized(String),

    #[error("no standup channel configured for workspace {0}")]
    NoChannel(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StandupError {
    /// Configuration errors are reported back to whoever tried to apply the
    /// change; the previous value stays in place.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimezone(_)
                | Self::InvalidTriggerTime(_)
                | Self::InvalidLookback(_)
                | Self::InvalidDate(_)
                | Self::InvalidId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StandupError>;
