//! Tally command line interface
//!
//! Glues the template, compile, and checklist crates to the outside
//! world: argument parsing, the version-control handle, the blocking
//! editor launch, first-time scaffolding, and the viewing session.
//!
//! The flows live here as a library so the integration tests can drive
//! them with explicit base directories instead of ambient process state.

#![warn(unreachable_pub)]

pub mod check;
pub mod generate;
pub mod scaffold;
pub mod vcs;
pub mod view;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
