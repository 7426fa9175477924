//! End-to-end fallback scenarios against the in-memory runtime.
//!
//! Each test builds a small host program in a [`MemoryRuntime`], attaches a
//! [`FallbackPatcher`], and checks that the first failing call is still raised while the
//! offending method gets patched for later calls.

use std::sync::{Arc, Mutex};

use certfallback::{
    config::{
        CERTIFICATE_EXCEPTION, PEER_UNVERIFIED_EXCEPTION, PINNING_FAILURE_PREFIX,
        TRANSPARENCY_FAILURE_MESSAGE, X509_TRUST_MANAGER,
    },
    prelude::*,
};

const STRING: &str = "java.lang.String";
const CERT_ARRAY: &str = "[Ljava.security.cert.X509Certificate;";
const LIST: &str = "java.util.List";

/// Trust manager counting its calls.
struct CountingTrustManager {
    accept: bool,
    calls: Mutex<usize>,
}

impl CountingTrustManager {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl TrustManager for CountingTrustManager {
    fn check_server_trusted(&self, _chain: &[Certificate], _auth_type: &str) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        if self.accept {
            Ok(())
        } else {
            Err(Error::CertificateRejected("counting manager rejects".to_string()))
        }
    }
}

fn attach(runtime: &Arc<MemoryRuntime>, trust_manager: Arc<dyn TrustManager>) -> Result<Arc<FallbackPatcher>> {
    let patcher = Arc::new(FallbackPatcher::new(runtime.clone(), trust_manager));
    patcher.attach()?;
    Ok(patcher)
}

fn certificates() -> Vec<Certificate> {
    vec![
        Certificate::new("CN=api.example.com", vec![1, 1, 1]),
        Certificate::new("CN=Intermediate", vec![2, 2, 2]),
    ]
}

/// `C.verify(Chain): Response` fails certificate transparency. After one failure the
/// method must continue the chain with the chain's own request.
#[test]
fn test_transparency_interceptor_is_bypassed() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(ClassDef::builder("Request").build());
    runtime.define(ClassDef::builder("Response").field("request", "Request").build());
    runtime.define(
        ClassDef::builder("Chain")
            .field("req", "Request")
            .method("next", ["Request"], "Response", |rt, _, args| {
                rt.new_object("Response", [("request", args[0].clone())])
            })
            .build(),
    );
    runtime.define(
        ClassDef::builder("C")
            .method("verify", ["Chain"], "Response", |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, TRANSPARENCY_FAILURE_MESSAGE))
            })
            .build(),
    );

    let patcher = attach(&runtime, CountingTrustManager::new(true))?;

    let request = runtime.new_object("Request", Vec::<(&str, Value)>::new())?;
    let chain = runtime.new_object("Chain", [("req", request.clone())])?;
    let verifier = runtime.new_object("C", Vec::<(&str, Value)>::new())?;

    // First occurrence: the error is still raised, exactly once.
    let first = runtime.call(&verifier, "verify", std::slice::from_ref(&chain));
    match first {
        Err(Error::Thrown(thrown)) => {
            assert_eq!(thrown.class_name, CERTIFICATE_EXCEPTION);
            assert_eq!(thrown.message, TRANSPARENCY_FAILURE_MESSAGE);
        }
        other => panic!("expected the original error, got {other:?}"),
    }
    assert_eq!(runtime.constructions(CERTIFICATE_EXCEPTION), 1);

    let reports = patcher.reports();
    assert_eq!(reports.len(), 1);
    let text = reports[0].to_string();
    assert!(text.contains("Fallback"));
    assert!(text.contains("patch"));
    assert!(text.contains("C->verify"));

    // Second occurrence: the replacement proceeds with the chain's request.
    let response = runtime.call(&verifier, "verify", std::slice::from_ref(&chain))?;
    assert_eq!(runtime.get_field(&response, "request")?, request);
    assert_eq!(runtime.constructions(CERTIFICATE_EXCEPTION), 1);
    assert_eq!(patcher.reports().len(), 1);

    Ok(())
}

/// A custom trust manager whose base check always throws gets delegated.
#[test]
fn test_trust_manager_is_delegated() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("com.bank.StrictTrustManager")
            .implements(X509_TRUST_MANAGER)
            .method("checkServerTrusted", [CERT_ARRAY, STRING], "void", |rt, _, _| {
                Err(rt.throw(PEER_UNVERIFIED_EXCEPTION, "Hostname not verified"))
            })
            .build(),
    );

    let trust_manager = CountingTrustManager::new(true);
    let patcher = attach(&runtime, trust_manager.clone())?;
    let manager = runtime.new_object("com.bank.StrictTrustManager", Vec::<(&str, Value)>::new())?;
    let args = [Value::certificate_array(certificates()), Value::string("RSA")];

    assert!(runtime.call(&manager, "checkServerTrusted", &args).is_err());
    assert_eq!(trust_manager.calls(), 0);

    let key = MethodDescriptor::new("com.bank.StrictTrustManager", "checkServerTrusted", [CERT_ARRAY, STRING], "void").key();
    assert_eq!(
        patcher.registry().get(&key).map(|p| p.kind),
        Some(PatchKind::TrustManagerDelegate)
    );

    assert_eq!(runtime.call(&manager, "checkServerTrusted", &args)?, Value::Void);
    assert_eq!(trust_manager.calls(), 1);
    assert_eq!(runtime.constructions(PEER_UNVERIFIED_EXCEPTION), 1);

    Ok(())
}

/// A rejecting collaborator still fails the base overload after patching.
#[test]
fn test_delegate_rejection_propagates() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("com.bank.Tm")
            .implements(X509_TRUST_MANAGER)
            .method("checkServerTrusted", [CERT_ARRAY, STRING], "void", |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, "nope"))
            })
            .build(),
    );
    let _patcher = attach(&runtime, CountingTrustManager::new(false))?;
    let manager = runtime.new_object("com.bank.Tm", Vec::<(&str, Value)>::new())?;
    let args = [Value::certificate_array(certificates()), Value::string("RSA")];

    assert!(matches!(
        runtime.call(&manager, "checkServerTrusted", &args),
        Err(Error::Thrown(_))
    ));
    assert!(matches!(
        runtime.call(&manager, "checkServerTrusted", &args),
        Err(Error::CertificateRejected(_))
    ));

    Ok(())
}

/// The extended overload returns the presented chain even when delegation fails.
#[test]
fn test_extended_trust_manager_returns_chain() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("com.bank.ExtendedTm")
            .extends("com.bank.BaseTm")
            .method("checkServerTrusted", [CERT_ARRAY, STRING, STRING], LIST, |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, "Pin verification failed"))
            })
            .build(),
    );
    // The capability is inherited from the superclass.
    runtime.define(
        ClassDef::builder("com.bank.BaseTm")
            .implements(X509_TRUST_MANAGER)
            .build(),
    );

    let trust_manager = CountingTrustManager::new(false);
    let _patcher = attach(&runtime, trust_manager.clone())?;
    let manager = runtime.new_object("com.bank.ExtendedTm", Vec::<(&str, Value)>::new())?;
    let args = [
        Value::certificate_array(certificates()),
        Value::string("RSA"),
        Value::string("api.example.com"),
    ];

    assert!(runtime.call(&manager, "checkServerTrusted", &args).is_err());
    let chain = runtime.call(&manager, "checkServerTrusted", &args)?;

    assert_eq!(
        chain,
        Value::List(certificates().into_iter().map(Value::Certificate).collect())
    );
    assert_eq!(trust_manager.calls(), 1);

    Ok(())
}

/// OkHttp-style `check(String, List)` becomes a no-op.
#[test]
fn test_okhttp_pinner_becomes_no_op() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("okhttp3.CertificatePinner")
            .method("check", [STRING, LIST], "void", |rt, _, _| {
                let message = format!(
                    "{PINNING_FAILURE_PREFIX}\n  Peer certificate chain:\n    sha256/AAAA: CN=api.example.com"
                );
                Err(rt.throw(PEER_UNVERIFIED_EXCEPTION, &message))
            })
            .build(),
    );
    let patcher = attach(&runtime, CountingTrustManager::new(true))?;
    let pinner = runtime.new_object("okhttp3.CertificatePinner", Vec::<(&str, Value)>::new())?;
    let args = [Value::string("api.example.com"), Value::List(vec![])];

    assert!(runtime.call(&pinner, "check", &args).is_err());
    assert_eq!(runtime.call(&pinner, "check", &args)?, Value::Void);

    let report = &patcher.reports()[0];
    assert_eq!(report.installed_count(), 1);
    assert!(matches!(
        &report.outcomes[0],
        PatchOutcome::Installed { rule, kind: PatchKind::NoOp, .. } if rule == "okhttp-pinning"
    ));

    Ok(())
}

/// Unrecognized failures leave the host exactly as it was.
#[test]
fn test_unrecognized_failure_changes_nothing() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("com.example.Validator")
            .method("validate", [STRING], "boolean", |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, "Certificate expired"))
            })
            .build(),
    );
    let patcher = attach(&runtime, CountingTrustManager::new(true))?;
    let validator = runtime.new_object("com.example.Validator", Vec::<(&str, Value)>::new())?;

    for _ in 0..3 {
        assert!(runtime
            .call(&validator, "validate", &[Value::string("x")])
            .is_err());
    }

    assert_eq!(runtime.constructions(CERTIFICATE_EXCEPTION), 3);
    assert!(patcher.registry().is_empty());
    for report in patcher.reports() {
        assert!(report.failure.is_none());
        assert!(matches!(
            report.outcomes.as_slice(),
            [PatchOutcome::Unrecognized {
                reason: UnrecognizedReason::UnrecognizedTlsError,
                ..
            }]
        ));
    }

    Ok(())
}

/// A transparency failure whose argument is not a recognizable chain is left alone.
#[test]
fn test_ambiguous_chain_is_not_patched() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("Chain")
            .field("a", "Request")
            .field("b", "Request")
            .method("next", ["Request"], "Response", |_, _, _| Ok(Value::Null))
            .build(),
    );
    runtime.define(
        ClassDef::builder("C")
            .method("verify", ["Chain"], "Response", |rt, _, _| {
                Err(rt.throw(CERTIFICATE_EXCEPTION, TRANSPARENCY_FAILURE_MESSAGE))
            })
            .build(),
    );
    let patcher = attach(&runtime, CountingTrustManager::new(true))?;
    let chain = runtime.new_object("Chain", Vec::<(&str, Value)>::new())?;
    let verifier = runtime.new_object("C", Vec::<(&str, Value)>::new())?;

    assert!(runtime.call(&verifier, "verify", std::slice::from_ref(&chain)).is_err());
    assert!(runtime.call(&verifier, "verify", std::slice::from_ref(&chain)).is_err());

    assert!(patcher.registry().is_empty());
    assert!(matches!(
        patcher.reports()[0].outcomes.as_slice(),
        [PatchOutcome::Unrecognized {
            reason: UnrecognizedReason::ChainShapeMismatch,
            ..
        }]
    ));

    Ok(())
}
