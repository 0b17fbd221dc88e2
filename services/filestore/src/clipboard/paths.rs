//! Heuristics that turn clipboard text into path candidates.

use std::path::{Path, PathBuf};
use url::Url;

/// Local paths from a `text/uri-list` payload.
///
/// Comment lines are skipped and only `file://` URIs count.
pub fn parse_uri_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| line.starts_with("file://"))
        .filter_map(file_uri_to_path)
        .collect()
}

/// Decode a `file://` URI into a local path
pub fn file_uri_to_path(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    match url.to_file_path() {
        Ok(path) => Some(path.to_string_lossy().into_owned()),
        // Fallback for hosts the platform can't map
        Err(()) => urlencoding::decode(url.path()).ok().map(|p| p.into_owned()),
    }
}

/// Root-rooted (`/...`) or home-rooted (`~/...`) line as a path
pub fn unix_path_from_line(line: &str, home: Option<&Path>) -> Option<PathBuf> {
    if line.starts_with('/') {
        return Some(PathBuf::from(line));
    }
    if let Some(rest) = line.strip_prefix("~/") {
        return home.map(|h| h.join(rest));
    }
    None
}

/// Drive-letter (`C:\`, `C:/`) or UNC (`\\server`) line as a Windows path,
/// with forward slashes normalised to backslashes.
pub fn windows_path_from_line(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/');
    let unc = line.starts_with("\\\\");

    if drive || unc {
        Some(line.replace('/', "\\"))
    } else {
        None
    }
}

/// Expand a leading `~/` with the home directory
pub fn expand_home(line: &str, home: Option<&Path>) -> PathBuf {
    match (line.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(line),
    }
}
