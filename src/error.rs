use crate::directory::EntityKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0} cache is not ready yet, please retry shortly")]
    NotReady(EntityKind),

    #[error("Failed to refresh {entity} from Slack: {message}")]
    RefreshFetch { entity: EntityKind, message: String },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Snapshot IO error at {path:?}: {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot at {path:?} is not valid JSON: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Wrap a remote failure as a refresh error for `entity`
    pub fn refresh(entity: EntityKind, err: impl std::fmt::Display) -> Self {
        Self::RefreshFetch {
            entity,
            message: err.to_string(),
        }
    }

    /// Whether this error should stop the process when raised by the startup refresh
    pub fn is_fatal_at_startup(&self) -> bool {
        match self {
            Self::RefreshFetch { entity, .. } => *entity != EntityKind::Emoji,
            Self::Cancelled | Self::RateLimited(_) | Self::Config(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
