pub mod lsblk;
pub mod smart;

use thiserror::Error;

/// Why a device did not make it to evaluation.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{0} not found - install smartmontools")]
    ToolMissing(String),

    #[error("{device}: timed out after {secs}s")]
    Timeout { device: String, secs: u64 },

    #[error("{device}: SMART not available ({reason})")]
    SmartUnavailable { device: String, reason: String },

    #[error("{device}: SMART is disabled")]
    SmartDisabled { device: String },

    #[error("{device}: unreadable smartctl output: {source}")]
    Json {
        device: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectError {
    /// Errors that make every further device pointless to try.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CollectError::ToolMissing(_))
    }
}
