//! Error types for the job module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously by the job manager.
///
/// Failures after a process has been accepted are not errors here; they are
/// reported to viewers as a failure patch.
#[derive(Debug, Error)]
pub enum JobError {
    /// The download tool could not be started.
    #[error("Failed to start {tool}: {reason}")]
    SpawnFailed { tool: PathBuf, reason: String },

    /// Target ids are interpolated into a URL and matched against filenames.
    #[error("Invalid target id: {0:?}")]
    InvalidTarget(String),

    /// I/O error while talking to the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn spawn_failed(tool: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}
