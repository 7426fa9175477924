//! Replacement implementations installed on failing overloads.
//!
//! A [`Replacement`] is a tagged, cheaply-clonable closure. The tag ([`PatchKind`]) is what
//! diagnostics and the [`PatchRegistry`](crate::patch::PatchRegistry) report; the closure
//! is what the host runtime dispatches to for every later call of the overload.

use std::{fmt, sync::Arc};

use log::warn;
use strum::{Display, EnumIter};

use crate::{
    chain::ChainShape,
    runtime::{CallContext, Value},
    trust::{Certificate, TrustManager},
    Error, Result,
};

/// The behavior a replacement implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum PatchKind {
    /// Returns immediately without doing anything.
    #[strum(to_string = "no-op")]
    NoOp,
    /// Continues an interceptor chain with its current request unmodified.
    #[strum(to_string = "chain pass-through")]
    ChainPassThrough,
    /// Delegates base certificate validation to the collaborator trust manager.
    #[strum(to_string = "trust-manager delegate")]
    TrustManagerDelegate,
    /// Delegates where possible, then returns the presented certificates as the chain.
    #[strum(to_string = "trust-manager extended")]
    TrustManagerExtended,
}

/// Signature of a replacement body.
///
/// Receives the dispatch context and the call's arguments, returns what the patched
/// overload returns.
pub type ReplacementFn = Arc<dyn Fn(&CallContext<'_>, &[Value]) -> Result<Value> + Send + Sync>;

/// A replacement implementation for one overload.
#[derive(Clone)]
pub struct Replacement {
    kind: PatchKind,
    handler: ReplacementFn,
}

impl Replacement {
    /// Wraps an arbitrary handler under `kind`.
    #[must_use]
    pub fn new(kind: PatchKind, handler: ReplacementFn) -> Self {
        Self { kind, handler }
    }

    /// The behavior this replacement implements.
    #[must_use]
    pub fn kind(&self) -> PatchKind {
        self.kind
    }

    /// Runs the replacement.
    ///
    /// # Errors
    ///
    /// Returns whatever the replacement body returns.
    pub fn invoke(&self, context: &CallContext<'_>, args: &[Value]) -> Result<Value> {
        (self.handler)(context, args)
    }

    /// A body that returns without doing anything.
    #[must_use]
    pub fn no_op() -> Self {
        Self::new(PatchKind::NoOp, Arc::new(|_: &CallContext<'_>, _: &[Value]| Ok(Value::Void)))
    }

    /// A body that reads the chain's request field and continues the chain with it.
    ///
    /// The chain is the overload's only argument. The result of the proceed call is
    /// returned unchanged.
    #[must_use]
    pub fn chain_pass_through(shape: ChainShape) -> Self {
        Self::new(
            PatchKind::ChainPassThrough,
            Arc::new(move |context: &CallContext<'_>, args: &[Value]| {
                let chain = args.first().ok_or_else(|| {
                    Error::InvalidArgument(format!("{} called without a chain", context.method))
                })?;
                let request = context.runtime.get_field(chain, &shape.request_field)?;
                context.runtime.invoke(
                    chain,
                    &shape.proceed_method,
                    std::slice::from_ref(&shape.request_type),
                    &[request],
                )
            }),
        )
    }

    /// A body that hands the certificate chain and auth type to `trust_manager`.
    ///
    /// A rejection by the trust manager propagates to the caller.
    #[must_use]
    pub fn trust_manager_delegate(trust_manager: Arc<dyn TrustManager>) -> Self {
        Self::new(
            PatchKind::TrustManagerDelegate,
            Arc::new(move |context: &CallContext<'_>, args: &[Value]| {
                let (chain, auth_type) = trust_arguments(context, args)?;
                trust_manager.check_server_trusted(&chain, auth_type)?;
                Ok(Value::Void)
            }),
        )
    }

    /// A body that tries `trust_manager` and then returns the presented certificates.
    ///
    /// A rejection is logged and does not change the return value.
    #[must_use]
    pub fn trust_manager_extended(trust_manager: Arc<dyn TrustManager>) -> Self {
        Self::new(
            PatchKind::TrustManagerExtended,
            Arc::new(move |context: &CallContext<'_>, args: &[Value]| {
                let (chain, auth_type) = trust_arguments(context, args)?;
                if let Err(error) = trust_manager.check_server_trusted(&chain, auth_type) {
                    warn!(
                        "[!] Delegate trust manager rejected chain in {}->{}: {}",
                        context.method.class_name, context.method.method_name, error
                    );
                }
                Ok(Value::List(
                    chain.into_iter().map(Value::Certificate).collect(),
                ))
            }),
        )
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replacement").field("kind", &self.kind).finish()
    }
}

/// Extracts `(certificates, auth_type)` from a trust-manager call's arguments.
fn trust_arguments<'a>(
    context: &CallContext<'_>,
    args: &'a [Value],
) -> Result<(Vec<Certificate>, &'a str)> {
    let chain = args
        .first()
        .and_then(Value::certificates)
        .ok_or_else(|| {
            Error::InvalidArgument(format!("{} expects a certificate array", context.method))
        })?;
    let auth_type = args.get(1).and_then(Value::as_str).ok_or_else(|| {
        Error::InvalidArgument(format!("{} expects an auth type string", context.method))
    })?;
    Ok((chain, auth_type))
}
