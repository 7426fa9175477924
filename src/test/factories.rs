use std::sync::Arc;

use crate::{
    config::{CERTIFICATE_EXCEPTION, CHECK_SERVER_TRUSTED, TRANSPARENCY_FAILURE_MESSAGE, X509_TRUST_MANAGER},
    runtime::{ClassDef, MemoryRuntime, Value},
    test::{RecordingTrustManager, CERT_ARRAY, LIST, STRING},
    FallbackPatcher, Result,
};

pub const REQUEST: &str = "com.example.Request";
pub const RESPONSE: &str = "com.example.Response";
pub const CHAIN: &str = "com.example.Chain";
pub const VERIFIER: &str = "com.example.C";

/// Defines `C.verify(Chain): Response`, which fails certificate transparency, and the
/// chain it receives.
///
/// Returns the request held by the chain and a closure calling `verify`.
pub fn define_transparency_target(
    runtime: &Arc<MemoryRuntime>,
) -> (Value, impl Fn() -> Result<Value>) {
    runtime.define(ClassDef::builder(REQUEST).build());
    runtime.define(ClassDef::builder(RESPONSE).field("request", REQUEST).build());
    runtime.define(
        ClassDef::builder(CHAIN)
            .field("req", REQUEST)
            .method("next", [REQUEST], RESPONSE, |rt, _, args| {
                rt.new_object(RESPONSE, [("request", args[0].clone())])
            })
            .build(),
    );
    runtime.define(
        ClassDef::builder(VERIFIER)
            .method("verify", [CHAIN], RESPONSE, |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, TRANSPARENCY_FAILURE_MESSAGE))
            })
            .build(),
    );

    let request = runtime
        .new_object(REQUEST, Vec::<(&str, Value)>::new())
        .unwrap();
    let chain = runtime.new_object(CHAIN, [("req", request.clone())]).unwrap();
    let verifier = runtime
        .new_object(VERIFIER, Vec::<(&str, Value)>::new())
        .unwrap();

    let runtime = Arc::clone(runtime);
    let verify = move || runtime.call(&verifier, "verify", std::slice::from_ref(&chain));
    (request, verify)
}

/// Defines a trust manager whose base `checkServerTrusted` always rejects.
///
/// With `with_siblings`, the class also declares the extended overload and an overload
/// taking an engine, which no rule recognizes.
pub fn define_trust_manager(runtime: &MemoryRuntime, class_name: &str, with_siblings: bool) -> Value {
    let mut class = ClassDef::builder(class_name)
        .implements(X509_TRUST_MANAGER)
        .method(CHECK_SERVER_TRUSTED, [CERT_ARRAY, STRING], "void", |rt, _, _| {
            Err(rt.throw(
                CERTIFICATE_EXCEPTION,
                "Trust anchor for certification path not found.",
            ))
        });

    if with_siblings {
        class = class
            .method(CHECK_SERVER_TRUSTED, [CERT_ARRAY, STRING, STRING], LIST, |rt, _, _| {
                Err(rt.throw(
                    CERTIFICATE_EXCEPTION,
                    "Trust anchor for certification path not found.",
                ))
            })
            .method(
                CHECK_SERVER_TRUSTED,
                [CERT_ARRAY, STRING, "javax.net.ssl.SSLEngine"],
                "void",
                |_, _, _| Ok(Value::Void),
            );
    }

    runtime.define(class.build());
    runtime
        .new_object(class_name, Vec::<(&str, Value)>::new())
        .unwrap()
}

/// A patcher over `runtime`, attached.
pub fn patcher_for(
    runtime: &Arc<MemoryRuntime>,
    trust_manager: RecordingTrustManager,
) -> Arc<FallbackPatcher> {
    let patcher = Arc::new(FallbackPatcher::new(runtime.clone(), Arc::new(trust_manager)));
    patcher.attach().unwrap();
    patcher
}
