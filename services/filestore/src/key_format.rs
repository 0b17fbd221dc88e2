//! Object key templating.
//!
//! Recognized placeholders:
//! - `{filename}`: base name without extension
//! - `{ext}`: extension including the leading dot, or nothing
//! - `{timestamp}`: unix seconds at format time
//! - `{uuid}`: a random v4 UUID
//! - `{rand}`: 6 random characters from `[A-Za-z0-9]`
//!
//! Any other text, including unknown `{...}` sequences, is copied verbatim.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;
use uuid::Uuid;

const RAND_LEN: usize = 6;

/// Expands a key template for each uploaded file
#[derive(Debug, Clone, Default)]
pub struct KeyFormatter {
    template: String,
}

impl KeyFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Produce an object key for `file_name`.
    ///
    /// An empty template yields `<unix-seconds>/<file_name>`.
    pub fn format(&self, file_name: &str) -> String {
        format_key(file_name, &self.template)
    }
}

/// Expand `template` for `file_name`
pub fn format_key(file_name: &str, template: &str) -> String {
    let timestamp = Utc::now().timestamp();

    if template.is_empty() {
        return format!("{}/{}", timestamp, file_name);
    }

    let (stem, ext) = split_name(file_name);
    let mut out = String::with_capacity(template.len() + file_name.len());
    let mut rest = template;

    // Single pass so substituted values are never re-expanded
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let expanded = match tail.find('}') {
            Some(end) => match &tail[..=end] {
                "{filename}" => Some((stem.to_string(), end + 1)),
                "{ext}" => Some((ext.clone(), end + 1)),
                "{timestamp}" => Some((timestamp.to_string(), end + 1)),
                "{uuid}" => Some((Uuid::new_v4().to_string(), end + 1)),
                "{rand}" => Some((random_string(RAND_LEN), end + 1)),
                _ => None,
            },
            None => None,
        };

        match expanded {
            Some((value, consumed)) => {
                out.push_str(&value);
                rest = &tail[consumed..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);

    out
}

/// Split a file name into stem and dotted extension
fn split_name(file_name: &str) -> (&str, String) {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    (stem, ext)
}

/// Generate a random alphanumeric string
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
