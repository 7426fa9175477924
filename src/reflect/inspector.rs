//! Signature inspection over [`Reflectable`] classes.

use std::collections::{BTreeSet, HashMap};

use crate::{
    reflect::{FieldDescriptor, MethodDescriptor, Reflectable},
    Result,
};

/// A snapshot of everything the classifier is allowed to know about a class.
///
/// Produced by [`ClassSignature::inspect`]. Every overload of a method is kept as its own
/// [`MethodDescriptor`], numbered by its position within the overload group.
///
/// # Examples
///
/// ```rust
/// use certfallback::reflect::{ClassSignature, MethodDescriptor, FieldDescriptor};
///
/// let signature = ClassSignature::from_parts(
///     "okhttp3.RealInterceptorChain",
///     vec![FieldDescriptor::new("okhttp3.RealInterceptorChain", "request", "okhttp3.Request")],
///     vec![
///         MethodDescriptor::new("okhttp3.RealInterceptorChain", "proceed", ["okhttp3.Request"], "okhttp3.Response"),
///         MethodDescriptor::new("okhttp3.RealInterceptorChain", "proceed", ["okhttp3.Request", "int"], "okhttp3.Response"),
///     ],
///     Vec::<String>::new(),
/// );
///
/// let overloads: Vec<_> = signature.overloads("proceed").collect();
/// assert_eq!(overloads.len(), 2);
/// assert_eq!(overloads[1].overload_index, 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassSignature {
    class_name: String,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDescriptor>,
    interfaces: BTreeSet<String>,
}

impl ClassSignature {
    /// Reads fields, methods and implemented interfaces from a class handle.
    ///
    /// # Errors
    ///
    /// Returns whatever error the underlying [`Reflectable`] reports.
    pub fn inspect(class: &dyn Reflectable) -> Result<Self> {
        Ok(Self::from_parts(
            class.class_name(),
            class.fields()?,
            class.methods()?,
            class.interfaces()?,
        ))
    }

    /// Builds a signature from already-reflected parts, numbering overloads.
    #[must_use]
    pub fn from_parts<I, S>(
        class_name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        methods: Vec<MethodDescriptor>,
        interfaces: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let methods = methods
            .into_iter()
            .map(|method| {
                let index = seen.entry(method.name.clone()).or_insert(0);
                let method = method.with_overload_index(*index);
                *index += 1;
                method
            })
            .collect();

        Self {
            class_name: class_name.into(),
            fields,
            methods,
            interfaces: interfaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Fully-qualified class name.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// All declared fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// All declared methods, every overload included.
    #[must_use]
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Every overload in the group named `name`, in declaration order.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDescriptor> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Declared fields whose type is exactly `type_name`.
    pub fn fields_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = &'a FieldDescriptor> {
        self.fields.iter().filter(move |f| f.type_name == type_name)
    }

    /// Implemented interfaces, including inherited ones.
    #[must_use]
    pub fn interfaces(&self) -> &BTreeSet<String> {
        &self.interfaces
    }

    /// Returns `true` if the class is assignable to `interface`.
    #[must_use]
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.contains(interface)
    }
}
