//! Runtime values passed through intercepted and replaced calls.

use std::fmt;

use crate::trust::Certificate;

/// Reference to an object living in the host runtime's heap.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Fully-qualified runtime class of the object.
    pub class_name: String,
    /// Host-assigned identity.
    pub id: u64,
}

/// A value crossing the boundary between host code and replacements.
///
/// Only the shapes the replacement behaviors need are modelled: strings and certificate
/// arrays for trust managers, lists for the extended trust-manager overload, and opaque
/// object references for interceptor chains and their requests.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Value {
    /// No value (void return).
    #[default]
    Void,
    /// The null reference.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer of any width.
    Int(i64),
    /// A platform string.
    Str(String),
    /// A single certificate.
    Certificate(Certificate),
    /// A fixed-size array.
    Array(Vec<Value>),
    /// A list collection.
    List(Vec<Value>),
    /// A heap object.
    Object(ObjectRef),
}

impl Value {
    /// Convenience constructor for [`Value::Str`].
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(value.into())
    }

    /// Builds a certificate array from certificates.
    #[must_use]
    pub fn certificate_array(certificates: impl IntoIterator<Item = Certificate>) -> Self {
        Value::Array(certificates.into_iter().map(Value::Certificate).collect())
    }

    /// Returns the object reference, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of an array or list.
    #[must_use]
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the certificates of a certificate array or list.
    ///
    /// Returns `None` if this is not a collection or any element is not a certificate.
    #[must_use]
    pub fn certificates(&self) -> Option<Vec<Certificate>> {
        self.as_elements()?
            .iter()
            .map(|item| match item {
                Value::Certificate(cert) => Some(cert.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Certificate(c) => write!(f, "Certificate({})", c.subject),
            Value::Array(items) => write!(f, "array[{}]", items.len()),
            Value::List(items) => write!(f, "list[{}]", items.len()),
            Value::Object(o) => write!(f, "{}@{:x}", o.class_name, o.id),
        }
    }
}
