//! Tally checklist compilation
//!
//! Turns a resolved template into the deterministic checklist artifacts:
//! the document model, its markdown rendering, and the attachment file
//! plan.
//!
//! # Pipeline
//!
//! ```text
//! Template → compile() → CompiledDocument → render()     → checklist text
//!                                         → build_plan() → attachment tree
//! ```
//!
//! Determinism is a hard requirement: identical input yields
//! byte-identical text and an identical path set, so repeated generation
//! produces empty version-control diffs. Nothing here iterates an
//! unordered map.

#![warn(unreachable_pub)]

mod compiler;
mod document;
mod error;
mod matcher;
mod plan;
mod render;

pub use compiler::compile;
pub use document::{CompiledDocument, DocSection, Item, Subgroup};
pub use error::CompileError;
pub use matcher::matches;
pub use plan::{build_plan, escape_component, unescape_component, AttachmentTarget, FilePlan};
pub use render::render;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
