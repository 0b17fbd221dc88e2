//! Windows clipboard access through PowerShell.

use super::error::ClipboardError;
use super::paths::windows_path_from_line;
use super::probe::{ClipboardSource, ToolProbe};
use std::path::PathBuf;

/// Exit code used by the file list script when no file drop list is present
const NO_FILE_LIST: i32 = 3;

const FILE_DROP_LIST: ToolProbe = ToolProbe::new(
    "powershell",
    &[
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        "$files = Get-Clipboard -Format FileDropList; \
         if ($null -eq $files) { exit 3 }; \
         $files | ForEach-Object { $_.FullName }",
    ],
);

const TEXT: ToolProbe = ToolProbe::new(
    "powershell",
    &["-NoProfile", "-NonInteractive", "-Command", "Get-Clipboard -Raw"],
);

/// Reads the Windows clipboard (CF_HDROP, then Unicode text)
#[derive(Default)]
pub struct WindowsClipboard;

impl WindowsClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardSource for WindowsClipboard {
    fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError> {
        let output = FILE_DROP_LIST
            .output()
            .map_err(|e| ClipboardError::Access(format!("powershell: {}", e)))?;

        match output.status.code() {
            Some(0) => Ok(Some(parse_file_list(&String::from_utf8_lossy(
                &output.stdout,
            )))),
            Some(NO_FILE_LIST) => Ok(None),
            _ => Err(ClipboardError::Access(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }

    fn text(&self) -> Result<String, ClipboardError> {
        let output = TEXT
            .output()
            .map_err(|e| ClipboardError::Access(format!("powershell: {}", e)))?;

        if !output.status.success() {
            return Err(ClipboardError::Access(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn path_from_line(&self, line: &str) -> Option<PathBuf> {
        windows_path_from_line(line).map(PathBuf::from)
    }
}

fn parse_file_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_list() {
        let stdout = "C:\\Users\\me\\a.png\r\n\r\nD:\\b c\\d.txt\r\n";
        assert_eq!(
            parse_file_list(stdout),
            vec!["C:\\Users\\me\\a.png", "D:\\b c\\d.txt"]
        );
        assert!(parse_file_list("").is_empty());
    }

    #[test]
    fn test_path_heuristic() {
        let clipboard = WindowsClipboard::new();
        assert_eq!(
            clipboard.path_from_line("C:/tmp/a.txt"),
            Some(PathBuf::from("C:\\tmp\\a.txt"))
        );
        assert_eq!(clipboard.path_from_line("/tmp/a.txt"), None);
    }
}
