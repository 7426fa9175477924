#![no_main]

use libfuzzer_sys::fuzz_target;
use certfallback::{
    classify::{RuleInput, RuleSet},
    reflect::{ClassSignature, FieldDescriptor, MethodDescriptor},
    stack::{locate_thrower, StackFrame},
    Error, FallbackConfig, Result,
};

// Input layout: NUL-separated strings. The first is the message, the second the error
// class, then (class, method) pairs forming the stack; the pair after the error class
// frame also serves as the overload's argument types.
fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut parts = text.split('\0');
    let message = parts.next().unwrap_or_default();
    let error_class = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let frames: Vec<StackFrame> = rest
        .chunks(2)
        .map(|pair| StackFrame::new(pair[0], pair.get(1).copied().unwrap_or_default()))
        .collect();

    let Ok(thrower) = locate_thrower(error_class, &frames) else {
        return;
    };

    let method = MethodDescriptor::new(
        thrower.class_name.clone(),
        thrower.method_name.clone(),
        rest.iter().take(3).copied(),
        rest.last().copied().unwrap_or("void"),
    );
    let class = ClassSignature::from_parts(
        thrower.class_name.clone(),
        vec![FieldDescriptor::new(thrower.class_name.clone(), "f", error_class)],
        vec![method.clone()],
        rest.iter().skip(3).copied(),
    );
    let echo = class.clone();
    let resolve = move |name: &str| -> Result<ClassSignature> {
        if name.len() % 2 == 0 {
            Ok(echo.clone())
        } else {
            Err(Error::ClassNotFound(name.to_string()))
        }
    };

    let _ = RuleSet::standard().classify(&RuleInput {
        message,
        method: &method,
        class: &class,
        config: &FallbackConfig::default(),
        resolve: &resolve,
    });
});
