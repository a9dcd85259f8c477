//! Tally checklist round-trip editing
//!
//! Parses a previously rendered checklist back into editable lines for
//! the interactive viewer, preserving unmanaged content byte-for-byte.
//! Edits are written back without ever re-running the compiler, so a
//! toggle shows up in version control as a one-character diff.
//!
//! ```rust
//! use tally_checklist::{ChecklistDocument, LineKind};
//!
//! let text = "# Tally\n\n- [ ] press every key\n";
//! let mut doc = ChecklistDocument::parse(text);
//! assert_eq!(doc.render(), text);
//!
//! doc.toggle(2).unwrap();
//! assert_eq!(doc.lines()[2].kind(), LineKind::Checked);
//! ```

#![warn(unreachable_pub)]

mod error;
mod parser;

pub use error::ChecklistError;
pub use parser::{ChecklistDocument, Line, LineKind, MANAGED_HEADING};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
