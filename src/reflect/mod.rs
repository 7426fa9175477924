//! Reflective introspection over unknown classes.
//!
//! Everything the classifier knows about a failing method comes through the
//! [`Reflectable`] trait: declared fields, declared methods (every overload), and the set
//! of interfaces the class is assignable to. Runtime adapters implement the trait over
//! their own introspection facility; classification never touches host types directly.
//!
//! # Key Components
//!
//! - [`Reflectable`] - The introspection seam implemented by runtime adapters
//! - [`ClassSignature`] - An inspected snapshot with overload and field lookups
//! - [`MethodDescriptor`] / [`MethodKey`] - One overload and its stable identity
//! - [`FieldDescriptor`] - One declared field

mod descriptor;
mod inspector;

pub use descriptor::{FieldDescriptor, MethodDescriptor, MethodKey};
pub use inspector::ClassSignature;

use crate::Result;

/// Reflective access to a class in the host runtime.
///
/// # Implementing
///
/// ```rust
/// use certfallback::reflect::{FieldDescriptor, MethodDescriptor, Reflectable};
///
/// struct Pinner;
///
/// impl Reflectable for Pinner {
///     fn class_name(&self) -> &str {
///         "okhttp3.CertificatePinner"
///     }
///
///     fn fields(&self) -> certfallback::Result<Vec<FieldDescriptor>> {
///         Ok(Vec::new())
///     }
///
///     fn methods(&self) -> certfallback::Result<Vec<MethodDescriptor>> {
///         Ok(vec![MethodDescriptor::new(
///             "okhttp3.CertificatePinner",
///             "check",
///             ["java.lang.String", "java.util.List"],
///             "void",
///         )])
///     }
///
///     fn interfaces(&self) -> certfallback::Result<Vec<String>> {
///         Ok(Vec::new())
///     }
/// }
/// ```
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; pipelines run on whichever host thread
/// constructed the error.
pub trait Reflectable: Send + Sync {
    /// Fully-qualified class name.
    fn class_name(&self) -> &str;

    /// Declared fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot enumerate fields.
    fn fields(&self) -> Result<Vec<FieldDescriptor>>;

    /// Declared methods, one descriptor per overload.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot enumerate methods.
    fn methods(&self) -> Result<Vec<MethodDescriptor>>;

    /// Interfaces the class is assignable to, inherited ones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot resolve the type hierarchy.
    fn interfaces(&self) -> Result<Vec<String>>;
}
