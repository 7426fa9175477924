//! The rule type and the standard rules.
//!
//! Each standard rule looks at the failure message, one overload's signature and the
//! declaring class's interface set. Rules return `Ok(None)` to pass, `Ok(Some(_))` to
//! decide, and `Err(_)` when a lookup they depend on fails.

use std::{fmt, sync::Arc};

use crate::{
    chain::match_chain_shape,
    classify::{PatchAction, UnrecognizedReason, Verdict},
    config::{FallbackConfig, CHECK_SERVER_TRUSTED, PINNING_FAILURE_PREFIX, TRANSPARENCY_FAILURE_MESSAGE},
    reflect::{ClassSignature, MethodDescriptor},
    Result,
};

/// Resolves a class name to its signature on demand.
pub type ClassResolver<'a> = &'a dyn Fn(&str) -> Result<ClassSignature>;

/// Everything a rule may look at.
pub struct RuleInput<'a> {
    /// The intercepted error's message.
    pub message: &'a str,
    /// The overload being classified.
    pub method: &'a MethodDescriptor,
    /// Signature of the overload's declaring class.
    pub class: &'a ClassSignature,
    /// Active configuration.
    pub config: &'a FallbackConfig,
    /// Lookup for other classes, such as argument types.
    pub resolve: ClassResolver<'a>,
}

impl RuleInput<'_> {
    /// Returns `true` if the declaring class is assignable to the trust-manager interface.
    #[must_use]
    pub fn is_trust_manager(&self) -> bool {
        self.class.implements(&self.config.trust_manager_interface)
    }

    /// Returns `true` if the overload is a trust manager's validation method.
    #[must_use]
    pub fn is_trust_check(&self) -> bool {
        self.method.name == CHECK_SERVER_TRUSTED && self.is_trust_manager()
    }
}

/// Body of a rule.
pub type RuleFn = Arc<dyn Fn(&RuleInput<'_>) -> Result<Option<Verdict>> + Send + Sync>;

/// A named classification rule.
#[derive(Clone)]
pub struct PatchRule {
    name: String,
    description: String,
    evaluate: RuleFn,
}

impl PatchRule {
    /// Creates a rule.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, evaluate: F) -> Self
    where
        F: Fn(&RuleInput<'_>) -> Result<Option<Verdict>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            evaluate: Arc::new(evaluate),
        }
    }

    /// Short identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the rule matches and what it does.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Applies the rule to `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup the rule depends on fails.
    pub fn evaluate(&self, input: &RuleInput<'_>) -> Result<Option<Verdict>> {
        (self.evaluate)(input)
    }

    /// OkHttp-style pinning: `check(String, ...)` raising the pinning-failure message.
    #[must_use]
    pub fn okhttp_pinning() -> Self {
        Self::new(
            "okhttp-pinning",
            "pinning-failure message on a (String, _) overload -> no-op",
            |input| {
                let applies = input.message.starts_with(PINNING_FAILURE_PREFIX)
                    && input.method.arity() == 2
                    && input.method.argument_types.first() == Some(&input.config.type_names.string);
                Ok(applies.then_some(Verdict::Patch(PatchAction::NoOp)))
            },
        )
    }

    /// Certificate transparency checked inside an interceptor chain.
    #[must_use]
    pub fn chain_pass_through() -> Self {
        Self::new(
            "chain-pass-through",
            "transparency-failure message on a single-argument overload taking an interceptor chain -> proceed unmodified",
            |input| {
                if input.message != TRANSPARENCY_FAILURE_MESSAGE || input.method.arity() != 1 {
                    return Ok(None);
                }
                let Some(argument_type) = input.method.argument_types.first() else {
                    return Ok(None);
                };
                let chain = (input.resolve)(argument_type)?;
                Ok(Some(
                    match match_chain_shape(&chain, &input.method.return_type) {
                        Some(shape) => Verdict::Patch(PatchAction::ChainPassThrough(shape)),
                        None => Verdict::Unrecognized(UnrecognizedReason::ChainShapeMismatch),
                    },
                ))
            },
        )
    }

    /// The base trust-manager validation overload.
    #[must_use]
    pub fn trust_manager_base() -> Self {
        Self::new(
            "trust-manager-base",
            "checkServerTrusted(X509Certificate[], String): void on a trust manager -> delegate",
            |input| {
                let names = &input.config.type_names;
                let applies = input.is_trust_check()
                    && input
                        .method
                        .has_arguments(&[names.certificate_array.as_str(), names.string.as_str()])
                    && input.method.return_type == names.void;
                Ok(applies.then_some(Verdict::Patch(PatchAction::TrustManagerDelegate)))
            },
        )
    }

    /// The extended trust-manager validation overload that also receives the host name.
    #[must_use]
    pub fn trust_manager_extended() -> Self {
        Self::new(
            "trust-manager-extended",
            "checkServerTrusted(X509Certificate[], String, String): List on a trust manager -> delegate and return the chain",
            |input| {
                let names = &input.config.type_names;
                let applies = input.is_trust_check()
                    && input.method.has_arguments(&[
                        names.certificate_array.as_str(),
                        names.string.as_str(),
                        names.string.as_str(),
                    ])
                    && input.method.return_type == names.list;
                Ok(applies.then_some(Verdict::Patch(PatchAction::TrustManagerExtended)))
            },
        )
    }

    /// Any other trust-manager validation overload.
    #[must_use]
    pub fn trust_manager_unrecognized() -> Self {
        Self::new(
            "trust-manager-unrecognized",
            "any other checkServerTrusted overload on a trust manager -> unrecognized signature",
            |input| {
                Ok(input
                    .is_trust_check()
                    .then_some(Verdict::Unrecognized(UnrecognizedReason::UnrecognizedSignature)))
            },
        )
    }

    /// Terminal rule.
    #[must_use]
    pub fn unrecognized_tls_error() -> Self {
        Self::new("default", "anything else -> unrecognized TLS error", |_| {
            Ok(Some(Verdict::Unrecognized(
                UnrecognizedReason::UnrecognizedTlsError,
            )))
        })
    }
}

impl fmt::Debug for PatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchRule")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
