//! # certfallback Prelude
//!
//! Commonly used types for wiring a [`FallbackPatcher`] into a runtime.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all certfallback operations
pub use crate::Error;

/// The result type used throughout certfallback
pub use crate::Result;

/// A managed exception raised inside the host runtime
pub use crate::ThrownError;

/// Pipeline configuration
pub use crate::config::{FallbackConfig, TypeNames};

// ================================================================================================
// Pipeline
// ================================================================================================

/// Interception orchestrator and its reports
pub use crate::intercept::{FallbackPatcher, PatchOutcome, PipelineReport};

/// Rules and verdicts
pub use crate::classify::{PatchAction, PatchRule, RuleSet, UnrecognizedReason, Verdict};

/// Replacements and their registry
pub use crate::patch::{PatchKind, PatchRegistry, Replacement};

// ================================================================================================
// Runtime Boundary
// ================================================================================================

/// Host runtime adapter and the in-memory runtime
pub use crate::runtime::{ClassDef, ErrorEvent, ManagedRuntime, MemoryRuntime, Value};

/// Reflection types
pub use crate::reflect::{ClassSignature, FieldDescriptor, MethodDescriptor, Reflectable};

/// Stack frames
pub use crate::stack::StackFrame;

/// Trust-manager collaborator
pub use crate::trust::{Certificate, PinnedTrustStore, TrustManager};
