//! Linux clipboard access via X11 and Wayland command line tools.

use super::error::ClipboardError;
use super::paths::{parse_uri_list, unix_path_from_line};
use super::probe::{first_success, ClipboardSource, ToolProbe};
use std::path::PathBuf;

/// `text/uri-list` readers, in order
const URI_LIST_PROBES: &[ToolProbe] = &[
    ToolProbe::new(
        "xclip",
        &["-selection", "clipboard", "-t", "text/uri-list", "-o"],
    ),
    ToolProbe::new("wl-paste", &["-t", "text/uri-list"]),
];

/// Plain text readers, in order
const TEXT_PROBES: &[ToolProbe] = &[
    ToolProbe::new("xclip", &["-selection", "clipboard", "-o"]),
    ToolProbe::new("xsel", &["--clipboard", "--output"]),
    ToolProbe::new("wl-paste", &[]),
];

/// Reads the clipboard with xclip, xsel or wl-paste
pub struct LinuxClipboard {
    home: Option<PathBuf>,
}

impl LinuxClipboard {
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
        }
    }
}

impl Default for LinuxClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for LinuxClipboard {
    /// A uri-list without any `file://` entry counts as absent.
    fn file_references(&self) -> Result<Option<Vec<String>>, ClipboardError> {
        let files = first_success(URI_LIST_PROBES)
            .map(|text| parse_uri_list(&text))
            .unwrap_or_default();

        Ok(if files.is_empty() { None } else { Some(files) })
    }

    /// Empty when every text tool fails.
    fn text(&self) -> Result<String, ClipboardError> {
        Ok(first_success(TEXT_PROBES).unwrap_or_default())
    }

    fn path_from_line(&self, line: &str) -> Option<PathBuf> {
        unix_path_from_line(line, self.home.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_order() {
        let uri_tools: Vec<_> = URI_LIST_PROBES.iter().map(|p| p.program).collect();
        assert_eq!(uri_tools, vec!["xclip", "wl-paste"]);

        let text_tools: Vec<_> = TEXT_PROBES.iter().map(|p| p.program).collect();
        assert_eq!(text_tools, vec!["xclip", "xsel", "wl-paste"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_home_relative_lines() {
        let clipboard = LinuxClipboard {
            home: Some(PathBuf::from("/home/user")),
        };
        assert_eq!(
            clipboard.path_from_line("~/a.txt"),
            Some(PathBuf::from("/home/user/a.txt"))
        );
        assert_eq!(clipboard.path_from_line("a.txt"), None);
    }
}
