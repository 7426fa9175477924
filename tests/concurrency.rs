//! Concurrent failures of the same method must patch it exactly once.

use std::{sync::Arc, thread};

use certfallback::{
    config::{CERTIFICATE_EXCEPTION, X509_TRUST_MANAGER},
    prelude::*,
};

const THREADS: usize = 16;

#[test]
fn test_concurrent_failures_patch_once() -> Result<()> {
    let runtime = Arc::new(MemoryRuntime::with_platform_classes());
    runtime.define(
        ClassDef::builder("com.example.RacyTm")
            .implements(X509_TRUST_MANAGER)
            .method(
                "checkServerTrusted",
                ["[Ljava.security.cert.X509Certificate;", "java.lang.String"],
                "void",
                |rt, _, _| Err(rt.throw(CERTIFICATE_EXCEPTION, "untrusted")),
            )
            .build(),
    );

    let proxy_ca = Certificate::new("CN=Proxy CA", vec![7, 7, 7]);
    let store = PinnedTrustStore::new().with_anchor(&proxy_ca);
    let patcher = Arc::new(FallbackPatcher::new(runtime.clone(), Arc::new(store)));
    patcher.attach()?;

    let manager = runtime.new_object("com.example.RacyTm", Vec::<(&str, Value)>::new())?;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            let manager = manager.clone();
            let proxy_ca = proxy_ca.clone();
            thread::spawn(move || {
                let args = [Value::certificate_array([proxy_ca]), Value::string("RSA")];
                runtime.call(&manager, "checkServerTrusted", &args).is_ok()
            })
        })
        .collect();

    let succeeded = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    let failed = THREADS - succeeded;

    assert!(failed >= 1);
    assert_eq!(runtime.constructions(CERTIFICATE_EXCEPTION), failed);
    assert_eq!(patcher.registry().len(), 1);

    let reports = patcher.reports();
    assert_eq!(reports.len(), failed);

    let installed: usize = reports.iter().map(PipelineReport::installed_count).sum();
    assert_eq!(installed, 1);
    for report in &reports {
        assert_eq!(report.outcomes.len(), 1);
        assert!(matches!(
            report.outcomes[0],
            PatchOutcome::Installed { .. } | PatchOutcome::AlreadyPatched { .. }
        ));
    }

    // Every thread succeeds once the patch is in place.
    let args = [Value::certificate_array([proxy_ca]), Value::string("RSA")];
    assert_eq!(runtime.call(&manager, "checkServerTrusted", &args)?, Value::Void);

    Ok(())
}
