//! Structural matching of interceptor-chain classes.
//!
//! Some HTTP client libraries route every request through a chain object: it holds the
//! in-flight request in a field and exposes a single operation that continues the chain
//! with a request and returns the response. Certificate-transparency checks sitting in
//! such a chain can be bypassed by simply continuing the chain with the request as-is.
//!
//! The library is unknown and usually obfuscated, so the chain is recognised by shape
//! only:
//!
//! - exactly one single-argument method returns the expected response type (proceed)
//! - exactly one declared field has that method's argument type (the request)
//!
//! Any ambiguity (zero or several candidates at either step) is a no-match.

use crate::reflect::ClassSignature;

/// The resolved members of an interceptor-chain class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChainShape {
    /// Name of the method continuing the chain.
    pub proceed_method: String,
    /// Name of the field holding the in-flight request.
    pub request_field: String,
    /// Type name of the request, i.e. the proceed method's only argument type.
    pub request_type: String,
}

/// Matches `chain` against the interceptor-chain shape.
///
/// Returns `None` unless exactly one single-argument method returns
/// `expected_return_type` and exactly one declared field has that method's argument type.
///
/// # Examples
///
/// ```rust
/// use certfallback::chain::match_chain_shape;
/// use certfallback::reflect::{ClassSignature, FieldDescriptor, MethodDescriptor};
///
/// let chain = ClassSignature::from_parts(
///     "a.b",
///     vec![FieldDescriptor::new("a.b", "e", "a.Request")],
///     vec![
///         MethodDescriptor::new("a.b", "a", ["a.Request"], "a.Response"),
///         MethodDescriptor::new("a.b", "c", Vec::<String>::new(), "a.Request"),
///     ],
///     Vec::<String>::new(),
/// );
///
/// let shape = match_chain_shape(&chain, "a.Response").unwrap();
/// assert_eq!(shape.proceed_method, "a");
/// assert_eq!(shape.request_field, "e");
/// ```
#[must_use]
pub fn match_chain_shape(chain: &ClassSignature, expected_return_type: &str) -> Option<ChainShape> {
    let proceed = single(
        chain
            .methods()
            .iter()
            .filter(|m| m.arity() == 1 && m.return_type == expected_return_type),
    )?;

    let request_type = proceed.argument_types.first()?;
    let request = single(chain.fields_of_type(request_type))?;

    Some(ChainShape {
        proceed_method: proceed.name.clone(),
        request_field: request.name.clone(),
        request_type: request_type.clone(),
    })
}

/// Returns the only item of `iter`, or `None` for zero or several.
fn single<T>(mut iter: impl Iterator<Item = T>) -> Option<T> {
    let first = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(first),
    }
}
