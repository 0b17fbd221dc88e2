//! Clipboard file resolution.
//!
//! Reads the current clipboard and turns it into file path candidates. Native
//! file references (Finder/Explorer/file manager copies) are preferred; plain
//! text is scanned line by line for things that look like local paths.
//!
//! Reading the clipboard shells out to platform tools that can hang, so every
//! call is bounded by a caller-supplied timeout.
//!
//! # Example
//!
//! ```ignore
//! use file_store::clipboard::{ClipboardResolver, SystemClipboard};
//! use std::time::Duration;
//!
//! let files = SystemClipboard::new().get_files(Duration::from_secs(5)).await?;
//! ```

mod error;
pub mod linux;
pub mod macos;
pub mod paths;
pub mod probe;
pub mod windows;

pub use error::ClipboardError;
pub use probe::{resolve_paths, ClipboardSource};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Timeout used by the upload operations
pub const DEFAULT_CLIPBOARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Strategy for reading file paths from the clipboard
#[async_trait]
pub trait ClipboardResolver: Send + Sync {
    /// File path candidates currently on the clipboard, within `timeout`
    async fn get_files(&self, timeout: Duration) -> Result<Vec<String>, ClipboardError>;
}

/// The clipboard of the machine the process runs on
pub struct SystemClipboard {
    source: Arc<dyn ClipboardSource>,
}

impl SystemClipboard {
    /// Use the source for the current target OS.
    pub fn new() -> Self {
        Self {
            source: platform_source(),
        }
    }

    /// Use a specific source.
    pub fn with_source(source: Arc<dyn ClipboardSource>) -> Self {
        Self { source }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipboardResolver for SystemClipboard {
    async fn get_files(&self, timeout: Duration) -> Result<Vec<String>, ClipboardError> {
        let (tx, rx) = oneshot::channel();
        let source = Arc::clone(&self.source);

        // A plain thread so a hung tool never holds up runtime shutdown.
        // On timeout the thread is left to finish and its result is dropped.
        std::thread::Builder::new()
            .name("clipboard-probe".to_string())
            .spawn(move || {
                let _ = tx.send(resolve_paths(source.as_ref()));
            })
            .map_err(|e| ClipboardError::TaskFailed(e.to_string()))?;

        tokio::select! {
            result = rx => match result {
                Ok(files) => {
                    debug!(result = ?files, "Clipboard resolved");
                    files
                }
                Err(_) => Err(ClipboardError::TaskFailed(
                    "clipboard probe exited without a result".to_string(),
                )),
            },
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Clipboard read timed out");
                Err(ClipboardError::Timeout(timeout))
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn platform_source() -> Arc<dyn ClipboardSource> {
    Arc::new(linux::LinuxClipboard::new())
}

#[cfg(target_os = "macos")]
fn platform_source() -> Arc<dyn ClipboardSource> {
    Arc::new(macos::MacClipboard::new())
}

#[cfg(target_os = "windows")]
fn platform_source() -> Arc<dyn ClipboardSource> {
    Arc::new(windows::WindowsClipboard::new())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn platform_source() -> Arc<dyn ClipboardSource> {
    Arc::new(probe::UnsupportedSource)
}
