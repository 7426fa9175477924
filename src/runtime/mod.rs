//! Host runtime adapter boundary.
//!
//! The pipeline reasons about unknown code in a host managed runtime, but it only ever
//! touches that runtime through [`ManagedRuntime`]: resolving classes reflectively,
//! reading the current thread's stack, reading fields and invoking methods on live
//! objects, installing replacement implementations, and hooking error constructors.
//!
//! # Key Components
//!
//! - [`ManagedRuntime`] - The adapter trait
//! - [`Value`] / [`ObjectRef`] - Values crossing the boundary
//! - [`ErrorEvent`] - One intercepted construction of a validation error
//! - [`CallContext`] - What a replacement sees when it is invoked
//! - [`MemoryRuntime`] - A complete in-process reference runtime
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐          ┌──────────────────────────┐
//! │  FallbackPatcher         │          │  ManagedRuntime          │
//! │  (intercept)             │──class──►│  (adapter over host      │
//! │                          │──stack──►│   reflection + hooking)  │
//! │                          │─install─►│                          │
//! └──────────────────────────┘          └──────────────────────────┘
//!              ▲                                     │
//!              └──────── ConstructorHook ◄───────────┘
//! ```

mod memory;
mod value;

pub use memory::{ClassDef, ClassDefBuilder, MemoryRuntime, NativeMethod};
pub use value::{ObjectRef, Value};

use std::{fmt, sync::Arc};

use crate::{
    patch::Replacement,
    reflect::{MethodDescriptor, MethodKey, Reflectable},
    stack::StackFrame,
    Result,
};

/// One construction of an intercepted validation-error type.
///
/// Created for every constructor call, consumed synchronously by the pipeline and then
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Fully-qualified class of the error being constructed.
    pub error_class: String,
    /// The message argument, empty when the constructor takes none.
    pub message: String,
    /// The instance under construction.
    pub instance: Value,
}

impl ErrorEvent {
    /// Creates a new error event.
    #[must_use]
    pub fn new(error_class: impl Into<String>, message: impl Into<String>, instance: Value) -> Self {
        Self {
            error_class: error_class.into(),
            message: message.into(),
            instance,
        }
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_class, self.message)
    }
}

/// Forwarding handle to the original constructor of an intercepted error.
pub type OriginalConstructor<'a> = &'a dyn Fn();

/// Handler installed on every constructor overload of an error class.
///
/// The handler receives the event and must call the original constructor exactly once.
pub type ConstructorHook = Arc<dyn Fn(&ErrorEvent, OriginalConstructor<'_>) + Send + Sync>;

/// Context passed to a replacement implementation when the host dispatches to it.
pub struct CallContext<'a> {
    /// The runtime dispatching the call, for field reads and nested invocations.
    pub runtime: &'a dyn ManagedRuntime,
    /// The overload being executed.
    pub method: &'a MethodKey,
    /// The receiver, [`Value::Null`] for static methods.
    pub this: &'a Value,
}

/// Adapter over a host runtime's introspection and hot-patching facilities.
///
/// # Thread Safety
///
/// All operations may be called concurrently from any host thread. Implementations must
/// not hold internal locks while running host code or hooks, because replacements and
/// hooks call back into the runtime.
pub trait ManagedRuntime: Send + Sync {
    /// Resolves a class by fully-qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`](crate::Error::ClassNotFound) if the class is
    /// unknown to the host.
    fn class(&self, name: &str) -> Result<Arc<dyn Reflectable>>;

    /// The current thread's call stack, innermost frame first.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot produce a stack trace.
    fn stack_trace(&self) -> Result<Vec<StackFrame>>;

    /// Reads a declared field off a live object.
    ///
    /// # Errors
    ///
    /// Returns an error if `object` is not an object or has no such field.
    fn get_field(&self, object: &Value, field: &str) -> Result<Value>;

    /// Invokes the overload of `method` with exactly `argument_types` on `target`.
    ///
    /// Dispatch honours installed replacements.
    ///
    /// # Errors
    ///
    /// Returns an error if the overload cannot be found, or whatever the invoked code
    /// raises.
    fn invoke(
        &self,
        target: &Value,
        method: &str,
        argument_types: &[String],
        args: &[Value],
    ) -> Result<Value>;

    /// Routes all future calls of `method` to `replacement`.
    ///
    /// Called at most once per overload; the [`PatchRegistry`](crate::patch::PatchRegistry)
    /// guarantees that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstallFailed`](crate::Error::InstallFailed) if the host refuses.
    fn install_replacement(&self, method: &MethodDescriptor, replacement: Replacement)
        -> Result<()>;

    /// Wraps every constructor overload of `error_class` with `hook`.
    ///
    /// Returns the number of constructor overloads hooked.
    ///
    /// # Errors
    ///
    /// Returns an error if the class cannot be resolved or hooked.
    fn hook_constructors(&self, error_class: &str, hook: ConstructorHook) -> Result<usize>;
}
