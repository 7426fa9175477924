//! Ordered rule evaluation.

use crate::{
    classify::{Classification, PatchRule, RuleInput, UnrecognizedReason, Verdict},
    Result,
};

/// Name reported when no rule of a custom set decides.
const NO_RULE: &str = "none";

/// An ordered list of [`PatchRule`]s.
///
/// # Rule Resolution
///
/// 1. Rules are evaluated in order for one overload at a time
/// 2. The first rule returning a verdict decides
/// 3. If no rule decides, the overload is an unrecognized TLS error
///
/// # Examples
///
/// ```rust
/// use certfallback::classify::{RuleInput, RuleSet, Verdict, PatchAction};
/// use certfallback::reflect::{ClassSignature, MethodDescriptor};
/// use certfallback::FallbackConfig;
///
/// let rules = RuleSet::standard();
/// let method = MethodDescriptor::new(
///     "okhttp3.CertificatePinner",
///     "check",
///     ["java.lang.String", "java.util.List"],
///     "void",
/// );
/// let class = ClassSignature::from_parts(
///     "okhttp3.CertificatePinner",
///     vec![],
///     vec![method.clone()],
///     Vec::<String>::new(),
/// );
/// let config = FallbackConfig::default();
/// let resolve = |name: &str| -> certfallback::Result<ClassSignature> {
///     Err(certfallback::Error::ClassNotFound(name.to_string()))
/// };
///
/// let decided = rules.classify(&RuleInput {
///     message: "Certificate pinning failure!\n  Peer certificate chain: ...",
///     method: &method,
///     class: &class,
///     config: &config,
///     resolve: &resolve,
/// })?;
///
/// assert_eq!(decided.rule, "okhttp-pinning");
/// assert_eq!(decided.verdict, Verdict::Patch(PatchAction::NoOp));
/// # Ok::<(), certfallback::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<PatchRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleSet {
    /// Creates a rule set evaluating `rules` in the given order.
    #[must_use]
    pub fn new(rules: Vec<PatchRule>) -> Self {
        Self { rules }
    }

    /// The standard rules, in evaluation order.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            PatchRule::okhttp_pinning(),
            PatchRule::chain_pass_through(),
            PatchRule::trust_manager_base(),
            PatchRule::trust_manager_extended(),
            PatchRule::trust_manager_unrecognized(),
            PatchRule::unrecognized_tls_error(),
        ])
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[PatchRule] {
        &self.rules
    }

    /// Classifies one overload.
    ///
    /// # Errors
    ///
    /// Returns the error of the first rule that fails. Later rules are not consulted.
    pub fn classify(&self, input: &RuleInput<'_>) -> Result<Classification> {
        for rule in &self.rules {
            if let Some(verdict) = rule.evaluate(input)? {
                return Ok(Classification {
                    rule: rule.name().to_string(),
                    verdict,
                });
            }
        }

        Ok(Classification {
            rule: NO_RULE.to_string(),
            verdict: Verdict::Unrecognized(UnrecognizedReason::UnrecognizedTlsError),
        })
    }
}
