//! Replacement implementations and their exactly-once installation.
//!
//! # Key Components
//!
//! - [`Replacement`] / [`PatchKind`] - The behaviors installed on failing overloads
//! - [`PatchRegistry`] - Which overloads are patched, with atomic check-and-install
//! - [`InstallOutcome`] - Installed now, or already patched and still failing

mod registry;
mod replacement;

pub use registry::{InstallOutcome, InstalledPatch, PatchRegistry};
pub use replacement::{PatchKind, Replacement, ReplacementFn};
