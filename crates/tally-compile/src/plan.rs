//! Attachment targets and the file plan
//!
//! Every file/command a checkbox references is backed by a path of the
//! shape `actor-key-or-generic/test-key/escaped-name`. The escaping is
//! reversible and shared with the renderer, so the link target written
//! into the checklist is the same string the file tree uses on disk.

use crate::document::{CompiledDocument, Item};
use crate::error::CompileError;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

/// U+2215 DIVISION SLASH, stands in for `/` inside path components
const DIVISION_SLASH: char = '\u{2215}';

/// U+00A0 NO-BREAK SPACE, stands in for ` ` inside path components
const NO_BREAK_SPACE: char = '\u{00A0}';

/// Escape a single path component
///
/// Replaces the path separator and spaces with visually equivalent
/// characters so any name becomes one valid file name.
#[must_use]
pub fn escape_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => DIVISION_SLASH,
            ' ' => NO_BREAK_SPACE,
            c => c,
        })
        .collect()
}

/// Reverse [`escape_component`]
#[must_use]
pub fn unescape_component(escaped: &str) -> String {
    escaped
        .chars()
        .map(|c| match c {
            DIVISION_SLASH => '/',
            NO_BREAK_SPACE => ' ',
            c => c,
        })
        .collect()
}

/// The derived path backing one checkbox attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentTarget {
    /// Actor key, or `generic`
    pub section: String,
    /// Test key
    pub test: String,
    /// Original file or command name, unescaped
    pub name: String,
    /// Relative path, `/`-separated, components escaped
    pub path: String,
}

impl AttachmentTarget {
    /// Derive the target for a (section, test, name) triple
    #[must_use]
    pub fn new(section: &str, test: &str, name: &str) -> Self {
        let path = format!(
            "{}/{}/{}",
            escape_component(section),
            escape_component(test),
            escape_component(name)
        );
        Self {
            section: section.to_string(),
            test: test.to_string(),
            name: name.to_string(),
            path,
        }
    }

    /// Relative path as a [`PathBuf`]
    #[inline]
    #[must_use]
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

impl fmt::Display for AttachmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.section, self.test, self.name)
    }
}

/// The ordered set of attachment targets of one compiled document
#[derive(Debug, Clone, Default)]
pub struct FilePlan {
    targets: Vec<AttachmentTarget>,
}

impl FilePlan {
    /// Targets in document order
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[AttachmentTarget] {
        &self.targets
    }

    /// Number of targets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether the plan is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Unique `section/test` directories, in first-use order
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut seen: IndexMap<(String, String), ()> = IndexMap::new();
        for t in &self.targets {
            seen.entry((t.section.clone(), t.test.clone())).or_insert(());
        }
        seen.keys()
            .map(|(section, test)| {
                PathBuf::from(escape_component(section)).join(escape_component(test))
            })
            .collect()
    }
}

/// Collect every attachment target of `doc`, in document order.
///
/// # Errors
/// `PathCollision` when two distinct (section, test, name) triples
/// escape to the same path. Raised here, before anything touches disk.
pub fn build_plan(doc: &CompiledDocument) -> Result<FilePlan, CompileError> {
    let mut by_path: IndexMap<String, AttachmentTarget> = IndexMap::new();

    let mut add = |target: &AttachmentTarget| -> Result<(), CompileError> {
        if let Some(first) = by_path.get(&target.path) {
            return Err(CompileError::path_collision(first, target));
        }
        by_path.insert(target.path.clone(), target.clone());
        Ok(())
    };

    for section in &doc.sections {
        for item in section.items() {
            match item {
                Item::Statement(_) => {}
                Item::File { target, .. } => add(target)?,
                Item::Command { target, .. } => {
                    if let Some(target) = target {
                        add(target)?;
                    }
                }
            }
        }
    }

    Ok(FilePlan {
        targets: by_path.into_values().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escaping_round_trips() {
        for name in ["plain", "with space", "a/b/c", "dmesg -w | head"] {
            assert_eq!(unescape_component(&escape_component(name)), name);
        }
    }

    #[test]
    fn names_already_containing_replacements_collide() {
        // Not injective for such names; build_plan catches the collision.
        assert_eq!(escape_component("a∕b"), escape_component("a/b"));
    }

    #[test]
    fn escaped_components_contain_no_separators() {
        let escaped = escape_component("var/log/messages from today");
        assert!(!escaped.contains('/'));
        assert!(!escaped.contains(' '));
    }

    #[test]
    fn target_path_shape() {
        let target = AttachmentTarget::new("generic", "test1", "file 01");
        assert_eq!(target.path, "generic/test1/file\u{00A0}01");
        assert_eq!(target.to_path().components().count(), 3);
    }

    #[test]
    fn target_display_names_the_triple() {
        let target = AttachmentTarget::new("actor1", "t4", "file04");
        assert_eq!(target.to_string(), "(actor1, t4, file04)");
    }
}
