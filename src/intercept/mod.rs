//! Interception of validation-error constructors and the fallback pipeline.
//!
//! # Key Components
//!
//! - [`FallbackPatcher`] - Hooks error constructors and drives locate, inspect, classify, install
//! - [`PipelineReport`] - What one intercepted construction led to
//! - [`PatchOutcome`] - Per-overload result, displayed as the diagnostic line

mod patcher;
mod report;

pub use patcher::FallbackPatcher;
pub use report::{PatchOutcome, PipelineReport};
