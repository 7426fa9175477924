//! Classification results.

use std::{fmt, sync::Arc};

use strum::Display;

use crate::{
    chain::ChainShape,
    patch::{PatchKind, Replacement},
    trust::TrustManager,
};

/// The replacement a rule selected for an overload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchAction {
    /// Replace with a body that does nothing.
    NoOp,
    /// Replace with a body that continues the interceptor chain unmodified.
    ChainPassThrough(ChainShape),
    /// Replace with a body that delegates to the collaborator trust manager.
    TrustManagerDelegate,
    /// Replace with a body that tries the trust manager and returns the presented chain.
    TrustManagerExtended,
}

impl PatchAction {
    /// The kind of replacement this action builds.
    #[must_use]
    pub fn kind(&self) -> PatchKind {
        match self {
            PatchAction::NoOp => PatchKind::NoOp,
            PatchAction::ChainPassThrough(_) => PatchKind::ChainPassThrough,
            PatchAction::TrustManagerDelegate => PatchKind::TrustManagerDelegate,
            PatchAction::TrustManagerExtended => PatchKind::TrustManagerExtended,
        }
    }

    /// Builds the replacement implementing this action.
    #[must_use]
    pub fn build(&self, trust_manager: &Arc<dyn TrustManager>) -> Replacement {
        match self {
            PatchAction::NoOp => Replacement::no_op(),
            PatchAction::ChainPassThrough(shape) => Replacement::chain_pass_through(shape.clone()),
            PatchAction::TrustManagerDelegate => {
                Replacement::trust_manager_delegate(Arc::clone(trust_manager))
            }
            PatchAction::TrustManagerExtended => {
                Replacement::trust_manager_extended(Arc::clone(trust_manager))
            }
        }
    }
}

/// Why no replacement was selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum UnrecognizedReason {
    /// A transparency failure whose argument class is not an interceptor chain.
    #[strum(to_string = "unrecognized interceptor chain shape")]
    ChainShapeMismatch,
    /// A trust-manager validation overload with an unknown signature.
    #[strum(to_string = "unrecognized signature")]
    UnrecognizedSignature,
    /// Nothing about the failure matched a known pattern.
    #[strum(to_string = "unrecognized TLS error")]
    UnrecognizedTlsError,
}

/// What a rule decided for one overload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Install a replacement.
    Patch(PatchAction),
    /// Leave the overload alone.
    Unrecognized(UnrecognizedReason),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Patch`].
    #[must_use]
    pub fn is_patch(&self) -> bool {
        matches!(self, Verdict::Patch(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Patch(action) => write!(f, "patch ({})", action.kind()),
            Verdict::Unrecognized(reason) => write!(f, "{reason}"),
        }
    }
}

/// A verdict together with the rule that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    /// Name of the deciding rule.
    pub rule: String,
    /// The decision.
    pub verdict: Verdict,
}
