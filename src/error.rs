use std::fmt;

use thiserror::Error;

/// A managed exception raised by code running inside the host runtime.
///
/// This is the value a host method "throws": the fully-qualified class name of the
/// exception and its message. Errors of this kind are expected during normal operation,
/// for example when a pinning check rejects a certificate before a patch is in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThrownError {
    /// Fully-qualified class name of the exception.
    pub class_name: String,
    /// The exception message, empty if none was supplied.
    pub message: String,
}

impl ThrownError {
    /// Creates a new thrown error.
    #[must_use]
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ThrownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.class_name)
        } else {
            write!(f, "{}: {}", self.class_name, self.message)
        }
    }
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Reflection Errors
/// - [`Error::ClassNotFound`] - A class could not be resolved by name
/// - [`Error::MethodNotFound`] - No overload with the requested name or shape exists
/// - [`Error::FieldNotFound`] - A field could not be read off an object
/// - [`Error::Reflection`] - The host introspection facility failed
///
/// ## Pipeline Errors
/// - [`Error::ThrowerNotFound`] - The call stack holds no frame for the constructed error
/// - [`Error::InstallFailed`] - The host refused to install a replacement
/// - [`Error::Panicked`] - A pipeline stage panicked and was contained
///
/// ## Runtime Errors
/// - [`Error::Thrown`] - Host code raised a managed exception
/// - [`Error::CertificateRejected`] - A trust manager rejected a certificate chain
/// - [`Error::InvalidArgument`] - A replacement received arguments it cannot handle
///
/// None of these are fatal to the host: the interception orchestrator catches every one
/// of them and degrades to "no patch installed".
#[derive(Error, Debug)]
pub enum Error {
    /// A class could not be resolved in the host runtime.
    #[error("Class not found - {0}")]
    ClassNotFound(String),

    /// A method could not be found on a class.
    #[error("Method not found - {class}->{method}")]
    MethodNotFound {
        /// The class that was searched
        class: String,
        /// The method name that was requested
        method: String,
    },

    /// A field could not be found on a class or object.
    #[error("Field not found - {class}.{field}")]
    FieldNotFound {
        /// The class that was searched
        class: String,
        /// The field name that was requested
        field: String,
    },

    /// The call stack contains no frame above the constructed error class.
    ///
    /// Raised when no frame matches the error class at all, or when the only match is
    /// the outermost frame. Classification is aborted instead of guessing a frame.
    #[error("No calling frame found above {0} in the current stack")]
    ThrowerNotFound(String),

    /// The host introspection facility failed.
    #[error("Reflection failure - {0}")]
    Reflection(String),

    /// A replacement or host method was invoked with unusable arguments.
    #[error("Invalid argument - {0}")]
    InvalidArgument(String),

    /// Code inside the host runtime raised a managed exception.
    #[error("Thrown - {0}")]
    Thrown(ThrownError),

    /// A trust manager rejected the presented certificate chain.
    #[error("Certificate rejected - {0}")]
    CertificateRejected(String),

    /// The host runtime refused to install a replacement implementation.
    #[error("Failed to install replacement on {method} - {reason}")]
    InstallFailed {
        /// The `Class->method(args)` signature that was targeted
        method: String,
        /// Why installation failed
        reason: String,
    },

    /// A pipeline stage panicked; the panic was caught at the interception boundary.
    #[error("Pipeline panicked - {0}")]
    Panicked(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl From<ThrownError> for Error {
    fn from(error: ThrownError) -> Self {
        Error::Thrown(error)
    }
}
