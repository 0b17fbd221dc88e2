//! Clipboard resolution errors.

use std::time::Duration;

/// Errors that can occur while reading file paths from the clipboard.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("timed out reading clipboard after {0:?}")]
    Timeout(Duration),

    #[error("failed to access clipboard: {0}")]
    Access(String),

    #[error("clipboard task failed: {0}")]
    TaskFailed(String),
}
