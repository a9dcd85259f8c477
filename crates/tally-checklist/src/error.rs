//! Error types for checklist round-trip editing

use std::path::PathBuf;

/// Errors raised while editing a parsed checklist
#[derive(Debug, thiserror::Error)]
pub enum ChecklistError {
    /// IO error reading or writing a checklist or attachment
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The targeted line is not a checkbox and cannot be edited
    #[error("line {0} is not a checkbox")]
    NotACheckbox(usize),

    /// Upload requires a checkbox with an attachment link
    #[error("line {0} has no attachment target")]
    NoAttachmentTarget(usize),
}

impl ChecklistError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
