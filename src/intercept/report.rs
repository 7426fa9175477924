//! Structured results of one pipeline run.

use std::fmt;

use crate::{
    classify::UnrecognizedReason,
    patch::PatchKind,
    reflect::MethodDescriptor,
    runtime::ErrorEvent,
    stack::StackFrame,
};

/// What happened to one overload of the failing method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// A replacement was installed.
    Installed {
        /// The patched overload
        method: MethodDescriptor,
        /// The rule that selected the replacement
        rule: String,
        /// What the replacement does
        kind: PatchKind,
    },
    /// A replacement was already in place and the method is still failing.
    AlreadyPatched {
        /// The overload
        method: MethodDescriptor,
        /// What the existing replacement does
        kind: PatchKind,
    },
    /// No rule recognized the overload.
    Unrecognized {
        /// The overload
        method: MethodDescriptor,
        /// The rule that gave up
        rule: String,
        /// Why
        reason: UnrecognizedReason,
    },
    /// A sibling overload was patched; this one matched nothing and was left alone.
    Skipped {
        /// The overload
        method: MethodDescriptor,
        /// Why it was not patched
        reason: UnrecognizedReason,
    },
    /// Classification or installation failed for this overload.
    Failed {
        /// The overload
        method: MethodDescriptor,
        /// The error message
        error: String,
    },
}

impl PatchOutcome {
    /// The overload this outcome is about.
    #[must_use]
    pub fn method(&self) -> &MethodDescriptor {
        match self {
            PatchOutcome::Installed { method, .. }
            | PatchOutcome::AlreadyPatched { method, .. }
            | PatchOutcome::Unrecognized { method, .. }
            | PatchOutcome::Skipped { method, .. }
            | PatchOutcome::Failed { method, .. } => method,
        }
    }

    /// Returns `true` if a replacement was installed by this run.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        matches!(self, PatchOutcome::Installed { .. })
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchOutcome::Installed { method, kind, .. } => write!(
                f,
                "[+] Fallback {kind} patch installed for {}",
                method.display_name()
            ),
            PatchOutcome::AlreadyPatched { method, kind } => write!(
                f,
                "[!] {} was already patched ({kind}) but is still failing",
                method.display_name()
            ),
            PatchOutcome::Unrecognized { method, reason, .. } => write!(
                f,
                "[!] Fallback patch not applied to {}: {reason}",
                method.display_name()
            ),
            PatchOutcome::Skipped { method, reason } => write!(
                f,
                "[!] Fallback patch not applied to {}: {reason} (sibling overload patched)",
                method.display_name()
            ),
            PatchOutcome::Failed { method, error } => write!(
                f,
                "[x] Fallback patch failed for {}: {error}",
                method.display_name()
            ),
        }
    }
}

/// Everything one intercepted construction led to.
///
/// The report mirrors the log lines written during the run, so callers can inspect the
/// outcome without a logger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReport {
    /// Class of the intercepted error.
    pub error_class: String,
    /// Message of the intercepted error.
    pub message: String,
    /// The frame that raised the error, once located.
    pub thrower: Option<StackFrame>,
    /// One entry per overload of the thrower's method.
    pub outcomes: Vec<PatchOutcome>,
    /// Set when the pipeline aborted before finishing.
    pub failure: Option<String>,
}

impl PipelineReport {
    /// Starts an empty report for `event`.
    #[must_use]
    pub fn new(event: &ErrorEvent) -> Self {
        Self {
            error_class: event.error_class.clone(),
            message: event.message.clone(),
            thrower: None,
            outcomes: Vec::new(),
            failure: None,
        }
    }

    /// Number of replacements installed by this run.
    #[must_use]
    pub fn installed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_installed()).count()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[*] Unexpected TLS failure {}", self.error_class)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(thrower) = &self.thrower {
            write!(f, "\n    thrown by {thrower}")?;
        }
        for outcome in &self.outcomes {
            write!(f, "\n{outcome}")?;
        }
        if let Some(failure) = &self.failure {
            write!(f, "\n[x] Fallback patching aborted: {failure}")?;
        }
        Ok(())
    }
}
