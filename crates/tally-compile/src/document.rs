//! The compiled document model
//!
//! Output of the compiler, input to the renderer and the file plan
//! builder. Ordering is structural: sections, groups, and items appear
//! exactly in the order the compiler inserted them, which mirrors the
//! template's source order.

use crate::plan::AttachmentTarget;
use tally_template::OutputMode;

/// One checkbox-producing entry
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// A plain checklist statement
    Statement(String),
    /// A file to collect, backed by an attachment
    File {
        /// Original file name
        name: String,
        /// Where the collected file lands
        target: AttachmentTarget,
    },
    /// A command to run
    Command {
        /// Invocation text
        run: String,
        /// Optional human description
        description: Option<String>,
        /// How the output is recorded
        mode: OutputMode,
        /// Attachment backing the output, for modes that keep it
        target: Option<AttachmentTarget>,
    },
}

/// A described test's own subsection
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    /// Key of the owning test
    pub test_key: String,
    /// Heading text
    pub title: String,
    /// Description paragraph
    pub description: String,
    /// Checkbox items, source order
    pub items: Vec<Item>,
}

/// One second-level section: Generic or an actor
#[derive(Debug, Clone, PartialEq)]
pub struct DocSection {
    /// Actor key, or `generic`
    pub key: String,
    /// Heading text
    pub title: String,
    /// Optional description paragraph
    pub description: Option<String>,
    /// Leading unlabeled group: items of description-less tests
    pub lead: Vec<Item>,
    /// One subgroup per described test, source order
    pub subgroups: Vec<Subgroup>,
}

impl DocSection {
    /// All items of the section, lead group first, then subgroups
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.lead
            .iter()
            .chain(self.subgroups.iter().flat_map(|s| s.items.iter()))
    }

    /// Whether the section contributes no checkboxes at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lead.is_empty() && self.subgroups.is_empty()
    }
}

/// The fully compiled checklist document
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    /// Free-form preamble paragraphs, verbatim
    pub preamble: Vec<String>,
    /// Generic first, then actors in first-definition order
    pub sections: Vec<DocSection>,
}
