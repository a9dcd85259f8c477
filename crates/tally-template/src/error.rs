//! Error types for template loading and resolution
//!
//! Every fatal error names the offending section and, where applicable,
//! the key inside it, so a template author can find the problem without
//! reading the loader source.

use std::path::PathBuf;

/// Errors raised while loading, validating, or resolving a template
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// IO error while reading a template or included file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax error in the (include-expanded) template text
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Top-level document is not a mapping
    #[error("invalid template format, expected a mapping of sections")]
    NotAMapping,

    /// A reserved name was used as a section
    #[error("section name '{0}' is reserved")]
    ReservedSection(String),

    /// `include:` directive encountered while loading from a string
    #[error("cannot include '{0}' when loading from a text stream")]
    IncludeWithoutPath(String),

    /// An included file declares a different format version
    #[error("cannot include {path}: version {found} does not match version {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u64,
        expected: u64,
    },

    /// A `version:` line that is not an integer
    #[error("invalid version '{0}', expected an integer")]
    InvalidVersion(String),

    /// The template declares a format version this build does not support
    #[error("unsupported template version {0}, expected 1")]
    UnsupportedVersion(u64),

    /// Section is missing the `type:` key (directly or via `extends`)
    #[error("section '{0}' does not have a type")]
    MissingType(String),

    /// Section declares an unknown `type:` value
    #[error("section '{section}' has invalid type '{value}'")]
    UnknownType { section: String, value: String },

    /// `extends:` points at a section that does not exist
    #[error("section '{section}' extends unknown section '{target}'")]
    UnknownReference { section: String, target: String },

    /// `extends:` crosses the actor/test boundary
    #[error("section '{section}' extends '{target}' of a different type")]
    TypeMismatch { section: String, target: String },

    /// `extends:` chain loops back on itself
    #[error("cyclic extends chain: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// A tag value is not a scalar
    #[error("section '{section}' tag '{key}' must be a scalar value")]
    NonScalarTag { section: String, key: String },

    /// A filter value has the wrong shape
    #[error("section '{section}' filter '{key}' must be a list of scalar values")]
    FilterShape { section: String, key: String },

    /// A section field has the wrong shape
    #[error("section '{section}' key '{key}' has an invalid value")]
    InvalidField { section: String, key: String },

    /// A field that does not belong to the section's type
    #[error("section '{section}' of type {kind} cannot have '{key}'")]
    UnexpectedField {
        section: String,
        kind: &'static str,
        key: String,
    },

    /// A test section with no statements, files, or commands
    #[error("section '{0}' has no test statements, files, or commands")]
    EmptyTest(String),

    /// Two actors resolve to the same display name
    #[error("duplicate actor name '{0}'")]
    DuplicateActorName(String),

    /// Template defines no tests at all
    #[error("template defines no tests")]
    NoTests,
}

impl TemplateError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown-reference error
    pub fn unknown_reference(section: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnknownReference {
            section: section.into(),
            target: target.into(),
        }
    }

    /// Create a type-mismatch error
    pub fn type_mismatch(section: impl Into<String>, target: impl Into<String>) -> Self {
        Self::TypeMismatch {
            section: section.into(),
            target: target.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_error_names_all_members() {
        let err = TemplateError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic extends chain: a -> b -> a");
    }

    #[test]
    fn errors_name_the_offending_section() {
        let err = TemplateError::unknown_reference("child", "ghost");
        assert!(err.to_string().contains("child"));
        assert!(err.to_string().contains("ghost"));

        let err = TemplateError::NonScalarTag {
            section: "kbd".into(),
            key: "bus".into(),
        };
        assert!(err.to_string().contains("kbd"));
        assert!(err.to_string().contains("bus"));
    }
}
