use std::{path::Path, sync::Arc};

use anyhow::Context;
use certfallback::{
    intercept::PatchOutcome,
    runtime::{ClassDef, ManagedRuntime},
    FallbackConfig, FallbackPatcher,
};
use serde::Serialize;

use crate::{
    app::GlobalOptions,
    output::{print_output, render_table, Column},
    scenario::Scenario,
};

#[derive(Debug, Serialize)]
struct OutcomeEntry {
    status: String,
    overload: String,
    detail: String,
}

#[derive(Debug, Serialize)]
struct ReplayOutput {
    error: String,
    thrower: Option<String>,
    outcomes: Vec<OutcomeEntry>,
    diagnostics: Vec<String>,
    failure: Option<String>,
}

pub fn run(path: &Path, minimal: bool, opts: &GlobalOptions) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)?;
    let output = replay(&scenario, minimal)?;

    print_output(&output, opts, |out| {
        println!("Error:    {}", out.error);
        println!(
            "Thrower:  {}",
            out.thrower.as_deref().unwrap_or("<not found>")
        );

        if !out.outcomes.is_empty() {
            println!();
            let rows = out.outcomes.iter().map(|entry| {
                vec![
                    entry.status.clone(),
                    entry.overload.clone(),
                    entry.detail.clone(),
                ]
            });
            println!(
                "{}",
                render_table(&[Column::Status, Column::Overload, Column::Detail], rows)
            );
        }

        if let Some(failure) = &out.failure {
            println!("\nPipeline aborted: {failure}");
        }
    })
}

fn replay(scenario: &Scenario, minimal: bool) -> anyhow::Result<ReplayOutput> {
    let runtime = Arc::new(scenario.build_runtime());
    if runtime.class(&scenario.error_class).is_err() {
        runtime.define(
            ClassDef::builder(scenario.error_class.clone())
                .extends("java.lang.Exception")
                .constructor(["java.lang.String"])
                .build(),
        );
    }

    let base = if minimal {
        FallbackConfig::minimal()
    } else {
        FallbackConfig::android()
    };
    let config = base.with_error_class(scenario.error_class.clone());

    let patcher = Arc::new(
        FallbackPatcher::new(runtime.clone(), Arc::new(scenario.trust_store())).with_config(config),
    );
    patcher.attach().context("failed to hook error constructors")?;

    let thrown = runtime
        .replay_error(&scenario.frames(), &scenario.error_class, &scenario.message)
        .context("failed to replay the recorded error")?;

    let report = patcher
        .last_report()
        .context("the replayed error was not intercepted")?;

    Ok(ReplayOutput {
        error: thrown.to_string(),
        thrower: report.thrower.as_ref().map(ToString::to_string),
        outcomes: report.outcomes.iter().map(outcome_entry).collect(),
        diagnostics: report.to_string().lines().map(str::to_string).collect(),
        failure: report.failure.clone(),
    })
}

fn outcome_entry(outcome: &PatchOutcome) -> OutcomeEntry {
    let (status, detail) = match outcome {
        PatchOutcome::Installed { rule, kind, .. } => ("installed", format!("{kind} ({rule})")),
        PatchOutcome::AlreadyPatched { kind, .. } => ("already-patched", kind.to_string()),
        PatchOutcome::Unrecognized { rule, reason, .. } => {
            ("unrecognized", format!("{reason} ({rule})"))
        }
        PatchOutcome::Skipped { reason, .. } => ("skipped", reason.to_string()),
        PatchOutcome::Failed { error, .. } => ("failed", error.clone()),
    };
    OutcomeEntry {
        status: status.to_string(),
        overload: outcome.method().to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn load(json: &str) -> Scenario {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        Scenario::load(file.path()).unwrap()
    }

    #[test]
    fn test_replay_transparency_chain() {
        let scenario = load(
            r#"{
                "error_class": "java.security.cert.CertificateException",
                "message": "Certificate transparency failed",
                "stack": [
                    { "class": "a.b.C", "method": "verify" },
                    { "class": "a.b.RealChain", "method": "proceed" }
                ],
                "classes": [
                    { "name": "a.b.C", "methods": [{ "name": "verify", "arguments": ["a.b.Chain"], "returns": "a.b.Response" }] },
                    {
                        "name": "a.b.Chain",
                        "fields": [{ "name": "r", "type": "a.b.Request" }],
                        "methods": [{ "name": "x", "arguments": ["a.b.Request"], "returns": "a.b.Response" }]
                    }
                ]
            }"#,
        );

        let output = replay(&scenario, false).unwrap();
        assert_eq!(output.thrower.as_deref(), Some("a.b.C->verify"));
        assert_eq!(output.outcomes.len(), 1);
        assert_eq!(output.outcomes[0].status, "installed");
        assert_eq!(output.outcomes[0].detail, "chain pass-through (chain-pass-through)");
        assert!(output
            .diagnostics
            .iter()
            .any(|line| line.contains("Fallback") && line.contains("a.b.C->verify")));
        assert!(output.failure.is_none());
    }

    #[test]
    fn test_replay_custom_error_class_without_frame() {
        let scenario = load(
            r#"{
                "error_class": "com.example.PinningException",
                "stack": [],
                "classes": []
            }"#,
        );

        let output = replay(&scenario, true).unwrap();
        assert!(output.thrower.is_none());
        assert!(output.outcomes.is_empty());
        assert!(output.failure.is_some());
        assert_eq!(output.error, "com.example.PinningException");
    }
}
