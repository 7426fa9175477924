//! Field and method descriptors produced by reflective inspection.

use std::fmt;

/// A declared field of a reflected class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Fully-qualified name of the class declaring the field.
    pub declaring_class: String,
    /// The field name.
    pub name: String,
    /// Fully-qualified name of the field's declared type.
    pub type_name: String,
}

impl FieldDescriptor {
    /// Creates a new field descriptor.
    #[must_use]
    pub fn new(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Stable identity of one method overload.
///
/// Two descriptors describe the same overload when class, name and the ordered argument
/// type names are equal; the return type does not participate, matching how the host
/// dispatches calls. This is the key the [`PatchRegistry`](crate::patch::PatchRegistry)
/// tracks installations by.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    /// Fully-qualified declaring class name.
    pub class_name: String,
    /// Method name.
    pub method_name: String,
    /// Ordered argument type names.
    pub argument_types: Vec<String>,
}

impl MethodKey {
    /// Creates a new method key.
    #[must_use]
    pub fn new<I, S>(class_name: impl Into<String>, method_name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            argument_types: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({})",
            self.class_name,
            self.method_name,
            self.argument_types.join(", ")
        )
    }
}

/// One concrete overload of a reflected method.
///
/// Descriptors are owned by the host's reflection metadata; this crate only reads them.
/// Whether a replacement has been installed is not stored here but in the
/// [`PatchRegistry`](crate::patch::PatchRegistry), keyed by [`MethodDescriptor::key`].
///
/// # Examples
///
/// ```rust
/// use certfallback::reflect::MethodDescriptor;
///
/// let method = MethodDescriptor::new(
///     "okhttp3.CertificatePinner",
///     "check",
///     ["java.lang.String", "java.util.List"],
///     "void",
/// );
/// assert_eq!(method.arity(), 2);
/// assert!(method.has_arguments(&["java.lang.String", "java.util.List"]));
/// assert_eq!(method.display_name(), "okhttp3.CertificatePinner->check");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Fully-qualified name of the declaring class.
    pub declaring_class: String,
    /// Method name. All overloads sharing it form one overload group.
    pub name: String,
    /// Ordered, fully-qualified argument type names.
    pub argument_types: Vec<String>,
    /// Fully-qualified return type name (`void` for none).
    pub return_type: String,
    /// Position of this overload within its overload group.
    pub overload_index: usize,
}

impl MethodDescriptor {
    /// Creates a new method descriptor at overload index 0.
    #[must_use]
    pub fn new<I, S>(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        argument_types: I,
        return_type: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            argument_types: argument_types.into_iter().map(Into::into).collect(),
            return_type: return_type.into(),
            overload_index: 0,
        }
    }

    /// Sets the overload index.
    #[must_use]
    pub fn with_overload_index(mut self, index: usize) -> Self {
        self.overload_index = index;
        self
    }

    /// Number of declared arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.argument_types.len()
    }

    /// Returns `true` if the argument type names equal `expected` exactly, in order.
    #[must_use]
    pub fn has_arguments(&self, expected: &[&str]) -> bool {
        self.argument_types.len() == expected.len()
            && self
                .argument_types
                .iter()
                .zip(expected)
                .all(|(actual, expected)| actual == expected)
    }

    /// The stable identity of this overload.
    #[must_use]
    pub fn key(&self) -> MethodKey {
        MethodKey {
            class_name: self.declaring_class.clone(),
            method_name: self.name.clone(),
            argument_types: self.argument_types.clone(),
        }
    }

    /// `Class->method`, the form used in diagnostics.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}->{}", self.declaring_class, self.name)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({}): {}",
            self.declaring_class,
            self.name,
            self.argument_types.join(", "),
            self.return_type
        )
    }
}
