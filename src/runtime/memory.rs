//! In-process reference implementation of [`ManagedRuntime`].
//!
//! [`MemoryRuntime`] models just enough of a managed runtime for the fallback pipeline to
//! run end to end without an instrumented target: class definitions with fields,
//! overloads and interfaces; heap objects; a call stack per host thread that is
//! maintained across dispatch; error constructors that honour installed hooks; and
//! dispatch that routes to an installed replacement when one exists.
//!
//! # Examples
//!
//! ```rust
//! use certfallback::runtime::{ClassDef, MemoryRuntime, Value};
//!
//! let runtime = MemoryRuntime::with_platform_classes();
//! runtime.define(
//!     ClassDef::builder("com.example.Greeter")
//!         .method("greet", ["java.lang.String"], "java.lang.String", |_rt, _this, args| {
//!             let name = args[0].as_str().unwrap_or("?");
//!             Ok(Value::string(format!("hello {name}")))
//!         })
//!         .build(),
//! );
//!
//! let greeter = runtime.new_object("com.example.Greeter", Vec::<(&str, Value)>::new())?;
//! let greeting = runtime.call(&greeter, "greet", &[Value::string("world")])?;
//! assert_eq!(greeting, Value::string("hello world"));
//! # Ok::<(), certfallback::Error>(())
//! ```

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
};

use dashmap::DashMap;

use crate::{
    config::{CERTIFICATE_EXCEPTION, CHECK_SERVER_TRUSTED, PEER_UNVERIFIED_EXCEPTION, X509_TRUST_MANAGER},
    patch::Replacement,
    reflect::{FieldDescriptor, MethodDescriptor, MethodKey, Reflectable},
    runtime::{CallContext, ConstructorHook, ErrorEvent, ManagedRuntime, ObjectRef, Value},
    stack::StackFrame,
    Error, Result, ThrownError,
};

/// Body of a method defined in a [`MemoryRuntime`].
///
/// Receives the runtime, the receiver (`Value::Null` for static calls) and the arguments.
pub type NativeMethod = Arc<dyn Fn(&MemoryRuntime, &Value, &[Value]) -> Result<Value> + Send + Sync>;

const STACK_TRACE_CLASS: &str = "java.lang.Thread";
const STACK_TRACE_METHOD: &str = "getStackTrace";
const CONSTRUCTOR: &str = "<init>";
const MESSAGE_FIELD: &str = "detailMessage";

struct MethodDef {
    descriptor: MethodDescriptor,
    body: Option<NativeMethod>,
}

/// A class definition registered with a [`MemoryRuntime`].
///
/// Built with [`ClassDef::builder`].
pub struct ClassDef {
    name: String,
    superclass: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldDescriptor>,
    methods: Vec<MethodDef>,
    constructors: Vec<Vec<String>>,
}

impl ClassDef {
    /// Starts building a class named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ClassDefBuilder {
        ClassDefBuilder {
            def: ClassDef {
                name: name.into(),
                superclass: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
            },
        }
    }

    /// Fully-qualified class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Descriptors of all declared methods, in declaration order.
    #[must_use]
    pub fn method_descriptors(&self) -> Vec<MethodDescriptor> {
        self.methods.iter().map(|m| m.descriptor.clone()).collect()
    }

    fn declares(&self, key: &MethodKey) -> bool {
        self.methods.iter().any(|m| &m.descriptor.key() == key)
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("field_count", &self.fields.len())
            .field("method_count", &self.methods.len())
            .field("constructor_count", &self.constructors.len())
            .finish()
    }
}

/// Fluent builder for [`ClassDef`].
pub struct ClassDefBuilder {
    def: ClassDef,
}

impl ClassDefBuilder {
    /// Sets the superclass.
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.def.superclass = Some(superclass.into());
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.def.interfaces.push(interface.into());
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let field = FieldDescriptor::new(self.def.name.clone(), name, type_name);
        self.def.fields.push(field);
        self
    }

    /// Declares a constructor overload.
    #[must_use]
    pub fn constructor<I, S>(mut self, argument_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def
            .constructors
            .push(argument_types.into_iter().map(Into::into).collect());
        self
    }

    /// Declares a method overload with an implementation.
    #[must_use]
    pub fn method<I, S, F>(
        mut self,
        name: impl Into<String>,
        argument_types: I,
        return_type: impl Into<String>,
        body: F,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&MemoryRuntime, &Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let descriptor =
            MethodDescriptor::new(self.def.name.clone(), name, argument_types, return_type);
        self.def.methods.push(MethodDef {
            descriptor,
            body: Some(Arc::new(body)),
        });
        self
    }

    /// Declares a method overload without an implementation.
    #[must_use]
    pub fn abstract_method<I, S>(
        mut self,
        name: impl Into<String>,
        argument_types: I,
        return_type: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor =
            MethodDescriptor::new(self.def.name.clone(), name, argument_types, return_type);
        self.def.methods.push(MethodDef {
            descriptor,
            body: None,
        });
        self
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> ClassDef {
        self.def
    }
}

/// Reflective view of a registered class, with its interface set resolved.
struct ReflectedClass {
    def: Arc<ClassDef>,
    interfaces: Vec<String>,
}

impl Reflectable for ReflectedClass {
    fn class_name(&self) -> &str {
        &self.def.name
    }

    fn fields(&self) -> Result<Vec<FieldDescriptor>> {
        Ok(self.def.fields.clone())
    }

    fn methods(&self) -> Result<Vec<MethodDescriptor>> {
        Ok(self.def.method_descriptors())
    }

    fn interfaces(&self) -> Result<Vec<String>> {
        Ok(self.interfaces.clone())
    }
}

struct HeapObject {
    class_name: String,
    fields: HashMap<String, Value>,
}

/// Pops the current thread's innermost frame when dropped.
struct FrameGuard<'a> {
    stacks: &'a DashMap<ThreadId, Vec<StackFrame>>,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut stack) = self.stacks.get_mut(&thread::current().id()) {
            stack.pop();
        }
    }
}

/// An in-process managed runtime.
///
/// # Thread Safety
///
/// All state lives in concurrent maps; no lock is held while host code, replacements or
/// constructor hooks run, so they may freely call back into the runtime. Each host thread
/// has its own call stack.
#[derive(Default)]
pub struct MemoryRuntime {
    classes: DashMap<String, Arc<ClassDef>>,
    objects: DashMap<u64, HeapObject>,
    next_object: AtomicU64,
    stacks: DashMap<ThreadId, Vec<StackFrame>>,
    replacements: DashMap<MethodKey, Replacement>,
    constructor_hooks: DashMap<String, Vec<ConstructorHook>>,
    constructions: DashMap<String, usize>,
}

impl MemoryRuntime {
    /// Creates an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime with the platform's validation-error classes and the
    /// trust-manager interface registered.
    #[must_use]
    pub fn with_platform_classes() -> Self {
        let runtime = Self::new();
        for error_class in [PEER_UNVERIFIED_EXCEPTION, CERTIFICATE_EXCEPTION] {
            runtime.define(
                ClassDef::builder(error_class)
                    .extends("java.lang.Exception")
                    .field(MESSAGE_FIELD, "java.lang.String")
                    .constructor(Vec::<String>::new())
                    .constructor(["java.lang.String"])
                    .constructor(["java.lang.String", "java.lang.Throwable"])
                    .build(),
            );
        }
        runtime.define(
            ClassDef::builder(X509_TRUST_MANAGER)
                .implements("javax.net.ssl.TrustManager")
                .abstract_method(
                    CHECK_SERVER_TRUSTED,
                    ["[Ljava.security.cert.X509Certificate;", "java.lang.String"],
                    "void",
                )
                .build(),
        );
        runtime
    }

    /// Registers (or replaces) a class definition.
    pub fn define(&self, class: ClassDef) {
        self.classes.insert(class.name.clone(), Arc::new(class));
    }

    /// Allocates an object of `class_name` with initial field values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is not registered.
    pub fn new_object<I, S>(&self, class_name: &str, fields: I) -> Result<Value>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        self.class_def(class_name)?;
        let id = self.next_object.fetch_add(1, Ordering::Relaxed) + 1;
        self.objects.insert(
            id,
            HeapObject {
                class_name: class_name.to_string(),
                fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            },
        );
        Ok(Value::Object(ObjectRef {
            class_name: class_name.to_string(),
            id,
        }))
    }

    /// Writes a field on a live object.
    ///
    /// # Errors
    ///
    /// Returns an error if `object` is not a live object.
    pub fn set_field(&self, object: &Value, field: &str, value: Value) -> Result<()> {
        let object_ref = expect_object(object)?;
        let mut heap_object = self
            .objects
            .get_mut(&object_ref.id)
            .ok_or_else(|| Error::InvalidArgument(format!("dangling reference {object}")))?;
        heap_object.fields.insert(field.to_string(), value);
        Ok(())
    }

    /// Calls the unique overload of `method` taking `args.len()` arguments on `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if no unique overload exists, or whatever the method raises.
    pub fn call(&self, target: &Value, method: &str, args: &[Value]) -> Result<Value> {
        let class_name = expect_object(target)?.class_name.clone();
        let (def, index) = self.resolve(&class_name, method, |m| m.arity() == args.len())?;
        self.dispatch(&def, index, target, args)
    }

    /// Calls the unique overload of a static `method` taking `args.len()` arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if no unique overload exists, or whatever the method raises.
    pub fn call_static(&self, class_name: &str, method: &str, args: &[Value]) -> Result<Value> {
        let (def, index) = self.resolve(class_name, method, |m| m.arity() == args.len())?;
        self.dispatch(&def, index, &Value::Null, args)
    }

    /// Constructs `error_class` with `message` and returns it as a thrown error.
    ///
    /// Convenience for method bodies: `return Err(runtime.throw(CLASS, "message"))`.
    #[must_use]
    pub fn throw(&self, error_class: &str, message: &str) -> Error {
        match self.construct_error(error_class, message) {
            Ok(thrown) => Error::Thrown(thrown),
            Err(error) => error,
        }
    }

    /// Constructs an instance of `error_class`, running any constructor hooks around the
    /// original constructor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the class is not registered.
    pub fn construct_error(&self, error_class: &str, message: &str) -> Result<ThrownError> {
        let instance = self.new_object(error_class, Vec::<(String, Value)>::new())?;
        let _frame = self.enter(StackFrame::new(error_class, CONSTRUCTOR));

        let event = ErrorEvent::new(error_class, message, instance.clone());
        let original = || {
            // The object was allocated above, so this cannot fail.
            let _ = self.set_field(&instance, MESSAGE_FIELD, Value::string(message));
            *self
                .constructions
                .entry(error_class.to_string())
                .or_insert(0) += 1;
        };

        let hooks = self
            .constructor_hooks
            .get(error_class)
            .map(|hooks| hooks.clone())
            .unwrap_or_default();
        run_constructor_hooks(&hooks, &event, &original);

        Ok(ThrownError::new(error_class, message))
    }

    /// Constructs `error_class` as if raised beneath a recorded call stack.
    ///
    /// `frames` is ordered innermost first, starting with the frame that raised the error.
    /// The frames are only present for the duration of the construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassNotFound`] if the error class is not registered.
    pub fn replay_error(
        &self,
        frames: &[StackFrame],
        error_class: &str,
        message: &str,
    ) -> Result<ThrownError> {
        let _frames: Vec<FrameGuard<'_>> = frames
            .iter()
            .rev()
            .map(|frame| self.enter(frame.clone()))
            .collect();
        self.construct_error(error_class, message)
    }

    /// How many times the original constructor of `error_class` has completed.
    #[must_use]
    pub fn constructions(&self, error_class: &str) -> usize {
        self.constructions
            .get(error_class)
            .map_or(0, |count| *count)
    }

    /// Returns the replacement installed for `key`, if any.
    #[must_use]
    pub fn replacement(&self, key: &MethodKey) -> Option<Replacement> {
        self.replacements.get(key).map(|r| r.value().clone())
    }

    /// Depth of the current thread's call stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stacks
            .get(&thread::current().id())
            .map_or(0, |stack| stack.len())
    }

    fn class_def(&self, name: &str) -> Result<Arc<ClassDef>> {
        self.classes
            .get(name)
            .map(|def| Arc::clone(def.value()))
            .ok_or_else(|| Error::ClassNotFound(name.to_string()))
    }

    fn enter(&self, frame: StackFrame) -> FrameGuard<'_> {
        self.stacks
            .entry(thread::current().id())
            .or_default()
            .push(frame);
        FrameGuard {
            stacks: &self.stacks,
        }
    }

    /// Finds the overload of `name` accepted by `accept`, nearest class first.
    fn resolve(
        &self,
        class_name: &str,
        name: &str,
        accept: impl Fn(&MethodDescriptor) -> bool,
    ) -> Result<(Arc<ClassDef>, usize)> {
        let mut visited = HashSet::new();
        let mut current = Some(class_name.to_string());

        while let Some(candidate) = current {
            if !visited.insert(candidate.clone()) {
                break;
            }
            let Ok(def) = self.class_def(&candidate) else {
                break;
            };

            let matches: Vec<usize> = def
                .methods
                .iter()
                .enumerate()
                .filter(|(_, m)| m.descriptor.name == name && accept(&m.descriptor))
                .map(|(index, _)| index)
                .collect();

            match matches.as_slice() {
                [index] => return Ok((Arc::clone(&def), *index)),
                [] => current = def.superclass.clone(),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "ambiguous overload {}->{}",
                        def.name, name
                    )))
                }
            }
        }

        Err(Error::MethodNotFound {
            class: class_name.to_string(),
            method: name.to_string(),
        })
    }

    fn dispatch(&self, def: &ClassDef, index: usize, this: &Value, args: &[Value]) -> Result<Value> {
        let method = def.methods.get(index).ok_or_else(|| Error::MethodNotFound {
            class: def.name.clone(),
            method: format!("#{index}"),
        })?;

        if method.descriptor.arity() != args.len() {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                method.descriptor,
                method.descriptor.arity(),
                args.len()
            )));
        }

        let key = method.descriptor.key();
        let _frame = self.enter(StackFrame::new(def.name.clone(), method.descriptor.name.clone()));

        if let Some(replacement) = self.replacement(&key) {
            let context = CallContext {
                runtime: self,
                method: &key,
                this,
            };
            return replacement.invoke(&context, args);
        }

        match &method.body {
            Some(body) => body(self, this, args),
            None => Err(Error::Error(format!("{key} has no implementation"))),
        }
    }

    fn assignable_interfaces(&self, class_name: &str) -> Vec<String> {
        let mut interfaces = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pending = vec![class_name.to_string()];

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Ok(def) = self.class_def(&name) else {
                continue;
            };
            for interface in &def.interfaces {
                interfaces.insert(interface.clone());
                pending.push(interface.clone());
            }
            if let Some(superclass) = &def.superclass {
                pending.push(superclass.clone());
            }
        }

        interfaces.into_iter().collect()
    }
}

fn expect_object(value: &Value) -> Result<&ObjectRef> {
    value
        .as_object()
        .ok_or_else(|| Error::InvalidArgument(format!("expected an object, got {value}")))
}

/// Runs `hooks` outermost-last around `original`.
fn run_constructor_hooks(hooks: &[ConstructorHook], event: &ErrorEvent, original: &dyn Fn()) {
    match hooks.split_last() {
        None => original(),
        Some((outer, inner)) => outer(event, &|| run_constructor_hooks(inner, event, original)),
    }
}

impl ManagedRuntime for MemoryRuntime {
    fn class(&self, name: &str) -> Result<Arc<dyn Reflectable>> {
        let def = self.class_def(name)?;
        Ok(Arc::new(ReflectedClass {
            interfaces: self.assignable_interfaces(name),
            def,
        }))
    }

    fn stack_trace(&self) -> Result<Vec<StackFrame>> {
        let mut frames = vec![StackFrame::new(STACK_TRACE_CLASS, STACK_TRACE_METHOD)];
        if let Some(stack) = self.stacks.get(&thread::current().id()) {
            frames.extend(stack.iter().rev().cloned());
        }
        Ok(frames)
    }

    fn get_field(&self, object: &Value, field: &str) -> Result<Value> {
        let object_ref = expect_object(object)?;
        let (class_name, value) = {
            let heap_object = self
                .objects
                .get(&object_ref.id)
                .ok_or_else(|| Error::InvalidArgument(format!("dangling reference {object}")))?;
            (
                heap_object.class_name.clone(),
                heap_object.fields.get(field).cloned(),
            )
        };

        if let Some(value) = value {
            return Ok(value);
        }

        let def = self.class_def(&class_name)?;
        if def.fields.iter().any(|f| f.name == field) {
            Ok(Value::Null)
        } else {
            Err(Error::FieldNotFound {
                class: class_name,
                field: field.to_string(),
            })
        }
    }

    fn invoke(
        &self,
        target: &Value,
        method: &str,
        argument_types: &[String],
        args: &[Value],
    ) -> Result<Value> {
        let class_name = expect_object(target)?.class_name.clone();
        let (def, index) =
            self.resolve(&class_name, method, |m| m.argument_types == argument_types)?;
        self.dispatch(&def, index, target, args)
    }

    fn install_replacement(
        &self,
        method: &MethodDescriptor,
        replacement: Replacement,
    ) -> Result<()> {
        let key = method.key();
        let declared = self
            .class_def(&method.declaring_class)
            .map(|def| def.declares(&key))
            .unwrap_or(false);

        if !declared {
            return Err(Error::InstallFailed {
                method: key.to_string(),
                reason: "overload is not declared by the class".to_string(),
            });
        }

        self.replacements.insert(key, replacement);
        Ok(())
    }

    fn hook_constructors(&self, error_class: &str, hook: ConstructorHook) -> Result<usize> {
        let def = self.class_def(error_class)?;
        if def.constructors.is_empty() {
            return Err(Error::MethodNotFound {
                class: error_class.to_string(),
                method: CONSTRUCTOR.to_string(),
            });
        }

        self.constructor_hooks
            .entry(error_class.to_string())
            .or_default()
            .push(hook);
        Ok(def.constructors.len())
    }
}

impl fmt::Debug for MemoryRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRuntime")
            .field("class_count", &self.classes.len())
            .field("object_count", &self.objects.len())
            .field("replacement_count", &self.replacements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchKind;

    fn runtime_with_counter() -> MemoryRuntime {
        let runtime = MemoryRuntime::with_platform_classes();
        runtime.define(
            ClassDef::builder("Base")
                .field("count", "int")
                .method("describe", Vec::<String>::new(), "java.lang.String", |_, _, _| {
                    Ok(Value::string("base"))
                })
                .build(),
        );
        runtime.define(
            ClassDef::builder("Counter")
                .extends("Base")
                .implements("Countable")
                .method("add", ["int"], "int", |rt, this, args| {
                    let Value::Int(current) = rt.get_field(this, "count")? else {
                        return Ok(Value::Int(0));
                    };
                    let Value::Int(delta) = args[0] else {
                        return Err(Error::InvalidArgument("delta".to_string()));
                    };
                    rt.set_field(this, "count", Value::Int(current + delta))?;
                    Ok(Value::Int(current + delta))
                })
                .method("add", ["int", "int"], "int", |_, _, args| match (&args[0], &args[1]) {
                    (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
                    _ => Err(Error::InvalidArgument("ints".to_string())),
                })
                .method("fail", Vec::<String>::new(), "void", |rt, _, _| {
                    Err(rt.throw(CERTIFICATE_EXCEPTION, "nope"))
                })
                .build(),
        );
        runtime.define(
            ClassDef::builder("Countable")
                .implements("Marker")
                .build(),
        );
        runtime
    }

    #[test]
    fn test_dispatch_by_arity_and_inheritance() {
        let runtime = runtime_with_counter();
        let counter = runtime
            .new_object("Counter", [("count", Value::Int(1))])
            .unwrap();

        assert_eq!(runtime.call(&counter, "add", &[Value::Int(2)]).unwrap(), Value::Int(3));
        assert_eq!(runtime.get_field(&counter, "count").unwrap(), Value::Int(3));
        assert_eq!(
            runtime
                .call(&counter, "add", &[Value::Int(2), Value::Int(5)])
                .unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            runtime.call(&counter, "describe", &[]).unwrap(),
            Value::string("base")
        );
        assert!(matches!(
            runtime.call(&counter, "missing", &[]),
            Err(Error::MethodNotFound { .. })
        ));
        assert_eq!(runtime.stack_depth(), 0);
    }

    #[test]
    fn test_get_field_defaults() {
        let runtime = runtime_with_counter();
        let counter = runtime
            .new_object("Counter", Vec::<(&str, Value)>::new())
            .unwrap();
        // Declared on Base, not on Counter itself.
        assert!(matches!(
            runtime.get_field(&counter, "count"),
            Err(Error::FieldNotFound { .. })
        ));
        let base = runtime.new_object("Base", Vec::<(&str, Value)>::new()).unwrap();
        assert_eq!(runtime.get_field(&base, "count").unwrap(), Value::Null);
    }

    #[test]
    fn test_interfaces_are_transitive() {
        let runtime = runtime_with_counter();
        let class = runtime.class("Counter").unwrap();
        assert_eq!(
            class.interfaces().unwrap(),
            vec!["Countable".to_string(), "Marker".to_string()]
        );
    }

    #[test]
    fn test_stack_trace_during_construction() {
        let runtime = runtime_with_counter();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let hook_runtime = Arc::new(runtime);
        let weak = Arc::downgrade(&hook_runtime);

        hook_runtime
            .hook_constructors(
                CERTIFICATE_EXCEPTION,
                Arc::new(move |_event: &ErrorEvent, original: crate::runtime::OriginalConstructor<'_>| {
                    if let Some(rt) = weak.upgrade() {
                        *captured.lock().unwrap() = rt.stack_trace().unwrap();
                    }
                    original();
                }),
            )
            .unwrap();

        let counter = hook_runtime
            .new_object("Counter", Vec::<(&str, Value)>::new())
            .unwrap();
        let result = hook_runtime.call(&counter, "fail", &[]);
        assert!(matches!(result, Err(Error::Thrown(ref t)) if t.message == "nope"));

        let frames = seen.lock().unwrap().clone();
        let names: Vec<String> = frames.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "java.lang.Thread->getStackTrace".to_string(),
                format!("{CERTIFICATE_EXCEPTION}-><init>"),
                "Counter->fail".to_string(),
            ]
        );
        assert_eq!(hook_runtime.constructions(CERTIFICATE_EXCEPTION), 1);
        assert_eq!(hook_runtime.stack_depth(), 0);
    }

    #[test]
    fn test_replacement_takes_over_dispatch() {
        let runtime = runtime_with_counter();
        let descriptor = MethodDescriptor::new("Counter", "fail", Vec::<String>::new(), "void");
        runtime
            .install_replacement(&descriptor, Replacement::no_op())
            .unwrap();

        let counter = runtime
            .new_object("Counter", Vec::<(&str, Value)>::new())
            .unwrap();
        assert_eq!(runtime.call(&counter, "fail", &[]).unwrap(), Value::Void);
        assert_eq!(runtime.constructions(CERTIFICATE_EXCEPTION), 0);
        assert_eq!(
            runtime.replacement(&descriptor.key()).map(|r| r.kind()),
            Some(PatchKind::NoOp)
        );
    }

    #[test]
    fn test_install_on_undeclared_overload_fails() {
        let runtime = runtime_with_counter();
        let inherited = MethodDescriptor::new("Counter", "describe", Vec::<String>::new(), "java.lang.String");
        assert!(matches!(
            runtime.install_replacement(&inherited, Replacement::no_op()),
            Err(Error::InstallFailed { .. })
        ));
    }

    #[test]
    fn test_hook_requires_constructors() {
        let runtime = runtime_with_counter();
        let hook: ConstructorHook =
            Arc::new(|_: &ErrorEvent, original: crate::runtime::OriginalConstructor<'_>| original());
        assert_eq!(
            runtime
                .hook_constructors(PEER_UNVERIFIED_EXCEPTION, Arc::clone(&hook))
                .unwrap(),
            3
        );
        assert!(runtime.hook_constructors("Counter", Arc::clone(&hook)).is_err());
        assert!(matches!(
            runtime.hook_constructors("Nope", hook),
            Err(Error::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_replay_error_uses_recorded_frames() {
        let runtime = runtime_with_counter();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let runtime = Arc::new(runtime);
        let weak = Arc::downgrade(&runtime);
        runtime
            .hook_constructors(
                PEER_UNVERIFIED_EXCEPTION,
                Arc::new(move |_event: &ErrorEvent, original: crate::runtime::OriginalConstructor<'_>| {
                    if let Some(rt) = weak.upgrade() {
                        *captured.lock().unwrap() = rt.stack_trace().unwrap();
                    }
                    original();
                }),
            )
            .unwrap();

        let recorded = vec![
            StackFrame::new("okhttp3.CertificatePinner", "check"),
            StackFrame::new("okhttp3.RealConnection", "connectTls"),
        ];
        let thrown = runtime
            .replay_error(&recorded, PEER_UNVERIFIED_EXCEPTION, "pinning")
            .unwrap();

        assert_eq!(thrown.message, "pinning");
        let frames = seen.lock().unwrap().clone();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1].method_name, "<init>");
        assert_eq!(frames[2], recorded[0]);
        assert_eq!(frames[3], recorded[1]);
        assert_eq!(runtime.stack_depth(), 0);
    }
}
