//! macOS clipboard access through `osascript` and `pbpaste`.
//!
//! Finder copies put file URLs on the pasteboard. When only text is present,
//! each line is treated as a path or a bare file name; bare names are looked
//! up in the usual user folders and then in the Spotlight index.

use super::error::ClipboardError;
use super::paths::expand_home;
use super::probe::{ClipboardSource, ToolProbe};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Prints the POSIX path of every file URL on the clipboard, one per line
const FILE_URL_SCRIPT: &str = r#"try
set fileList to {}
try
set fileList to (the clipboard as «class furl») as list
end try
set out to ""
repeat with f in fileList
set out to out & POSIX path of f & linefeed
end repeat
return out
on error
return ""
end try"#;

const PBPASTE: ToolProbe = ToolProbe::new("pbpaste", &[]);

/// Reads the macOS pasteboard
pub struct MacClipboard {
    home: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl MacClipboard {
    pub fn new() -> Self {
        let search_dirs = [
            dirs::desktop_dir(),
            dirs::document_dir(),
            dirs::download_dir(),
            dirs::picture_dir(),
            dirs::video_dir(),
            dirs::audio_dir(),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            home: dirs::home_dir(),
            search_dirs,
        }
    }

    /// Search with explicit directories (tests)
    pub fn with_search_dirs(home: Option<PathBuf>, search_dirs: Vec<PathBuf>) -> Self {
        Self { home, search_dirs }
    }

    /// Exact-name match in the common user folders
    fn search_common_dirs(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// First Spotlight hit for an exact display name under the home directory
    fn search_spotlight(&self, name: &str) -> Option<PathBuf> {
        let home = self.home.as_ref()?;
        let query = format!(
            "kMDItemDisplayName == '{}'",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );

        let output = Command::new("mdfind")
            .arg("-onlyin")
            .arg(home)
            .arg(&query)
            .output()
            .ok()?;
        if !output.status.success() {
            debug!(name = %name, "mdfind failed");
            return None;
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .filter(|path| path.exists())
    }
}

impl Default for MacClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for MacClipboard {
    fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError> {
        let output = Command::new("osascript")
            .args(["-e", FILE_URL_SCRIPT])
            .output()
            .map_err(|e| ClipboardError::Access(format!("osascript: {}", e)))?;

        if !output.status.success() {
            return Err(ClipboardError::Access(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let files: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        Ok(if files.is_empty() { None } else { Some(files) })
    }

    fn text(&self) -> Result<String, ClipboardError> {
        Ok(PBPASTE.run().unwrap_or_default())
    }

    /// Every line is a candidate; bare names are resolved by `locate`.
    fn path_from_line(&self, line: &str) -> Option<PathBuf> {
        Some(expand_home(line, self.home.as_deref()))
    }

    fn locate(&self, candidate: &Path) -> Option<PathBuf> {
        if candidate.is_absolute() {
            return candidate.exists().then(|| candidate.to_path_buf());
        }

        let name = candidate.to_str()?;
        self.search_common_dirs(name)
            .or_else(|| self.search_spotlight(name))
    }
}
