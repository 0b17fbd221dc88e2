use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path validation failures
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("invalid path {path}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("path cannot be a directory: {path}")]
    IsDirectory { path: String },
}

/// Validate a batch of candidate paths.
///
/// Returns absolute paths in input order. The first rejection aborts the batch.
pub fn validate_paths<S: AsRef<str>>(paths: &[S]) -> Result<Vec<PathBuf>, ValidationError> {
    paths.iter().map(|p| validate_path(p.as_ref())).collect()
}

/// Validate one candidate: non-empty, resolvable, existing, not a directory
pub fn validate_path(path: &str) -> Result<PathBuf, ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    let absolute = std::path::absolute(Path::new(path)).map_err(|source| {
        ValidationError::InvalidPath {
            path: path.to_string(),
            source,
        }
    })?;

    let metadata = std::fs::metadata(&absolute).map_err(|source| ValidationError::InvalidPath {
        path: path.to_string(),
        source,
    })?;

    if metadata.is_dir() {
        return Err(ValidationError::IsDirectory {
            path: path.to_string(),
        });
    }

    Ok(absolute)
}
