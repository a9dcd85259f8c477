//! Tally template loading
//!
//! Turns declarative YAML templates describing reusable test/actor
//! definitions into flat, immutable records ready for checklist
//! compilation.
//!
//! # Pipeline
//!
//! ```text
//! file/text → include expansion → YAML mapping → raw Sections
//!           → inheritance resolution → Template { actors, tests }
//! ```
//!
//! Templates support three preprocessor-level keywords (`version:`,
//! `include:`) and one section-level one (`extends:`). Everything is
//! validated at load time: tag and filter values must be scalars,
//! `extends` chains must be acyclic and stay within one section type,
//! and a template must define at least one test.

#![warn(unreachable_pub)]

mod error;
mod resolve;
mod section;
mod source;

pub use error::TemplateError;
pub use resolve::{
    FilterValue, ResolvedActor, ResolvedTest, Template, FILTER_ANY, GENERIC_KEY, GENERIC_NAME,
};
pub use section::{CommandSpec, OutputMode, Section, SectionKind};
pub use source::ExpandedSource;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
