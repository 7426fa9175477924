//! Call-stack location of the method that raised a validation error.
//!
//! When an intercepted error is constructed, the innermost frames of the current thread
//! belong to the runtime and to the error's own constructor. The method that actually
//! failed is the first frame above the error class's constructor frame.
//!
//! ```text
//! [0] dalvik.system.VMStack->getThreadStackTrace
//! [1] java.lang.Thread->getStackTrace
//! [2] java.security.cert.CertificateException-><init>     <- first frame of the error class
//! [3] com.example.PinningInterceptor->intercept           <- returned
//! [4] okhttp3.internal.http.RealInterceptorChain->proceed
//! ```

use std::fmt;

use crate::{Error, Result};

/// One entry of a call stack.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Fully-qualified declaring class name.
    pub class_name: String,
    /// Method name (`<init>` for constructors).
    pub method_name: String,
}

impl StackFrame {
    /// Creates a new stack frame.
    #[must_use]
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.class_name, self.method_name)
    }
}

/// Finds the frame that called into the constructor of `error_class`.
///
/// `frames` is ordered innermost first. The first frame whose class is `error_class` marks
/// the constructor; the frame immediately after it is returned.
///
/// # Errors
///
/// Returns [`Error::ThrowerNotFound`] if no frame belongs to `error_class`, or if the only
/// matching frame is the outermost one. No other frame is ever substituted.
///
/// # Examples
///
/// ```rust
/// use certfallback::stack::{locate_thrower, StackFrame};
///
/// let frames = vec![
///     StackFrame::new("java.lang.Thread", "getStackTrace"),
///     StackFrame::new("java.security.cert.CertificateException", "<init>"),
///     StackFrame::new("com.example.C", "verify"),
/// ];
///
/// let thrower = locate_thrower("java.security.cert.CertificateException", &frames)?;
/// assert_eq!(thrower.to_string(), "com.example.C->verify");
/// # Ok::<(), certfallback::Error>(())
/// ```
pub fn locate_thrower<'a>(error_class: &str, frames: &'a [StackFrame]) -> Result<&'a StackFrame> {
    frames
        .iter()
        .position(|frame| frame.class_name == error_class)
        .and_then(|index| frames.get(index + 1))
        .ok_or_else(|| Error::ThrowerNotFound(error_class.to_string()))
}
