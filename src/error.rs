use crate::safety::SafetyError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplaceError {
    #[error("No files found for patterns {patterns:?}: {reason}")]
    NoFilesFound {
        patterns: Vec<String>,
        reason: String,
    },

    #[error("Invalid edit request for {file}: {reason}")]
    InvalidEditRequest { file: PathBuf, reason: String },

    #[error(
        "Cannot have both line and file replacements for {file} in one commit; \
         use the whole-file pass for every edit to this file"
    )]
    MixedGranularity { file: PathBuf },

    #[error("Could not read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Path rejected: {0}")]
    Safety(#[from] SafetyError),
}

impl ReplaceError {
    pub(crate) fn no_files(patterns: &[String], reason: impl Into<String>) -> Self {
        ReplaceError::NoFilesFound {
            patterns: patterns.to_vec(),
            reason: reason.into(),
        }
    }

    /// The file this error is about, if it concerns a single file.
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            ReplaceError::InvalidEditRequest { file, .. }
            | ReplaceError::MixedGranularity { file } => Some(file),
            ReplaceError::FileRead { path, .. } | ReplaceError::FileWrite { path, .. } => {
                Some(path)
            }
            ReplaceError::NoFilesFound { .. } | ReplaceError::Safety(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_granularity_names_file() {
        let err = ReplaceError::MixedGranularity {
            file: PathBuf::from("notes.txt"),
        };
        assert!(err.to_string().starts_with("Cannot have both"));
        assert!(err.to_string().contains("notes.txt"));
        assert_eq!(err.file(), Some(std::path::Path::new("notes.txt")));
    }

    #[test]
    fn test_no_files_has_no_file() {
        let err = ReplaceError::no_files(&["*.md".to_string()], "pattern matched nothing");
        assert!(err.file().is_none());
        assert!(err.to_string().contains("*.md"));
    }
}
