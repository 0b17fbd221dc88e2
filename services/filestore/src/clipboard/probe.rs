//! External clipboard tools and the shared resolution tiers.

use super::error::ClipboardError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// One external command that may yield clipboard content
#[derive(Debug, Clone, Copy)]
pub struct ToolProbe {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl ToolProbe {
    pub const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    /// Run the command and capture its output.
    pub fn output(&self) -> std::io::Result<Output> {
        Command::new(self.program).args(self.args).output()
    }

    /// Stdout of the command when it exits successfully.
    pub fn run(&self) -> Option<String> {
        match self.output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!(
                    tool = self.program,
                    status = ?output.status.code(),
                    "Clipboard tool exited with failure"
                );
                None
            }
            Err(e) => {
                debug!(tool = self.program, error = %e, "Clipboard tool not available");
                None
            }
        }
    }
}

/// Run probes in order; the first one that succeeds wins.
pub fn first_success(probes: &[ToolProbe]) -> Option<String> {
    probes.iter().find_map(ToolProbe::run)
}

/// Platform access to the clipboard.
///
/// Implementations block; the resolver runs them off the async runtime.
pub trait ClipboardSource: Send + Sync {
    /// Native file references, or `None` when the clipboard holds no such format.
    fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError>;

    /// Plain text content; empty when there is none.
    fn text(&self) -> Result<String, ClipboardError>;

    /// A path candidate for a text line, if the line looks like a local path.
    fn path_from_line(&self, line: &str) -> Option<PathBuf>;

    /// Confirm a candidate on disk, possibly searching for it.
    fn locate(&self, candidate: &Path) -> Option<PathBuf> {
        candidate.exists().then(|| candidate.to_path_buf())
    }
}

/// Resolve clipboard content into file path candidates.
///
/// File references are authoritative: when the format is present its list is
/// returned as is, even if empty. Otherwise text lines that look like paths
/// and exist on disk are returned in clipboard order.
pub fn resolve_paths(source: &dyn ClipboardSource) -> Result<Vec<String>, ClipboardError> {
    if let Some(files) = source.file_references()? {
        debug!(count = files.len(), "Clipboard holds file references");
        return Ok(files);
    }

    let text = source.text()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let paths = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| source.path_from_line(line))
        .filter_map(|candidate| source.locate(&candidate))
        .map(|path| path.to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    debug!(count = paths.len(), "Resolved file paths from clipboard text");
    Ok(paths)
}

/// Source for targets without clipboard support
pub struct UnsupportedSource;

impl ClipboardSource for UnsupportedSource {
    fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError> {
        Err(ClipboardError::Access(format!(
            "unsupported platform: {}",
            std::env::consts::OS
        )))
    }

    fn text(&self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Access(format!(
            "unsupported platform: {}",
            std::env::consts::OS
        )))
    }

    fn path_from_line(&self, _line: &str) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::paths::unix_path_from_line;
    use std::io::Write;

    struct FakeSource {
        files: Option<Vec<String>>,
        text: String,
    }

    impl ClipboardSource for FakeSource {
        fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError> {
            Ok(self.files.clone())
        }

        fn text(&self) -> Result<String, ClipboardError> {
            Ok(self.text.clone())
        }

        fn path_from_line(&self, line: &str) -> Option<PathBuf> {
            unix_path_from_line(line, None)
        }
    }

    #[test]
    fn test_file_references_win() {
        let source = FakeSource {
            files: Some(vec!["/a/b.png".to_string()]),
            text: "/etc/hosts".to_string(),
        };
        assert_eq!(resolve_paths(&source).unwrap(), vec!["/a/b.png"]);
    }

    #[test]
    fn test_present_but_empty_file_references_do_not_fall_through() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = FakeSource {
            files: Some(Vec::new()),
            text: file.path().display().to_string(),
        };
        assert!(resolve_paths(&source).unwrap().is_empty());
    }

    #[test]
    fn test_empty_text_is_empty_result() {
        let source = FakeSource {
            files: None,
            text: "  \n\n".to_string(),
        };
        assert!(resolve_paths(&source).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_text_lines_filtered_by_heuristic_and_existence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x").unwrap();
        let existing = file.path().display().to_string();

        let source = FakeSource {
            files: None,
            text: format!(
                "hello world\n\n  {}  \n/tmp/does-not-exist-file-store\nrelative/path.txt\n",
                existing
            ),
        };
        assert_eq!(resolve_paths(&source).unwrap(), vec![existing]);
    }

    #[test]
    fn test_unsupported_source_reports_access_error() {
        let err = resolve_paths(&UnsupportedSource).unwrap_err();
        assert!(matches!(err, ClipboardError::Access(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_first_success_skips_missing_tools() {
        let probes = [
            ToolProbe::new("file-store-no-such-tool", &[]),
            ToolProbe::new("sh", &["-c", "exit 1"]),
            ToolProbe::new("sh", &["-c", "printf second"]),
            ToolProbe::new("sh", &["-c", "printf third"]),
        ];
        assert_eq!(first_success(&probes).as_deref(), Some("second"));
    }

    #[test]
    fn test_first_success_none_when_all_fail() {
        let probes = [ToolProbe::new("file-store-no-such-tool", &[])];
        assert!(first_success(&probes).is_none());
    }
}
