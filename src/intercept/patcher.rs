//! The interception orchestrator.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::{DashMap, DashSet};
use log::{error, info, warn};

use crate::{
    classify::{Classification, RuleInput, RuleSet, UnrecognizedReason, Verdict},
    config::FallbackConfig,
    intercept::{PatchOutcome, PipelineReport},
    patch::{InstallOutcome, PatchRegistry},
    reflect::{ClassSignature, MethodDescriptor},
    runtime::{ConstructorHook, ErrorEvent, ManagedRuntime, OriginalConstructor},
    stack::locate_thrower,
    trust::TrustManager,
    Error, Result,
};

/// Watches validation-error constructions and patches the methods raising them.
///
/// # Pipeline
///
/// For every intercepted construction:
///
/// 1. Read the current stack and locate the frame that called the error constructor
/// 2. Inspect the declaring class of that frame
/// 3. Classify every overload of the frame's method with the [`RuleSet`]
/// 4. Install the selected replacements through the [`PatchRegistry`]
/// 5. Forward to the original constructor
///
/// Steps 1 to 4 run inside a guard that contains errors and panics. Whatever happens,
/// the original constructor runs and the error is still raised on this occurrence; only
/// later calls see the replacement.
///
/// Only the last [`FallbackConfig::report_history`] reports are retained.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use certfallback::runtime::MemoryRuntime;
/// use certfallback::trust::PinnedTrustStore;
/// use certfallback::FallbackPatcher;
///
/// let runtime = Arc::new(MemoryRuntime::with_platform_classes());
/// let patcher = Arc::new(FallbackPatcher::new(runtime.clone(), Arc::new(PinnedTrustStore::new())));
///
/// // Three constructor overloads on each of the two default error classes.
/// assert_eq!(patcher.attach()?, 6);
/// # Ok::<(), certfallback::Error>(())
/// ```
pub struct FallbackPatcher {
    runtime: Arc<dyn ManagedRuntime>,
    trust_manager: Arc<dyn TrustManager>,
    config: FallbackConfig,
    rules: RuleSet,
    registry: PatchRegistry,
    attached: DashSet<String>,
    reports: DashMap<u64, PipelineReport>,
    next_report: AtomicU64,
}

impl FallbackPatcher {
    /// Creates a patcher with the default configuration and the standard rules.
    #[must_use]
    pub fn new(runtime: Arc<dyn ManagedRuntime>, trust_manager: Arc<dyn TrustManager>) -> Self {
        Self {
            runtime,
            trust_manager,
            config: FallbackConfig::default(),
            rules: RuleSet::standard(),
            registry: PatchRegistry::new(),
            attached: DashSet::new(),
            reports: DashMap::new(),
            next_report: AtomicU64::new(0),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: FallbackConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the rule set.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Active rule set.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Installed patches.
    #[must_use]
    pub fn registry(&self) -> &PatchRegistry {
        &self.registry
    }

    /// Retained reports, oldest first.
    #[must_use]
    pub fn reports(&self) -> Vec<PipelineReport> {
        let mut reports: Vec<(u64, PipelineReport)> = self
            .reports
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        reports.sort_unstable_by_key(|(sequence, _)| *sequence);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    /// The most recent retained report.
    #[must_use]
    pub fn last_report(&self) -> Option<PipelineReport> {
        self.reports
            .iter()
            .max_by_key(|entry| *entry.key())
            .map(|entry| entry.value().clone())
    }

    /// Removes and returns the retained reports, oldest first.
    pub fn drain_reports(&self) -> Vec<PipelineReport> {
        let sequences: Vec<u64> = self.reports.iter().map(|entry| *entry.key()).collect();
        let mut drained: Vec<(u64, PipelineReport)> = sequences
            .into_iter()
            .filter_map(|sequence| self.reports.remove(&sequence))
            .collect();
        drained.sort_unstable_by_key(|(sequence, _)| *sequence);
        drained.into_iter().map(|(_, report)| report).collect()
    }

    /// Hooks every constructor overload of every configured error class.
    ///
    /// A class that cannot be hooked is logged and skipped. Classes hooked by an earlier
    /// call are not hooked again. The hooks hold a weak reference, so dropping the last
    /// `Arc` of the patcher turns them into plain forwarders.
    ///
    /// Returns the number of constructor overloads newly hooked.
    ///
    /// # Errors
    ///
    /// Returns the first hooking error if no constructor at all could be hooked.
    pub fn attach(self: &Arc<Self>) -> Result<usize> {
        let mut hooked = 0;
        let mut first_error = None;

        for error_class in &self.config.error_classes {
            if !self.attached.insert(error_class.clone()) {
                continue;
            }

            let patcher = Arc::downgrade(self);
            let hook: ConstructorHook =
                Arc::new(move |event: &ErrorEvent, original: OriginalConstructor<'_>| {
                    match patcher.upgrade() {
                        Some(patcher) => patcher.intercept(event, original),
                        None => original(),
                    }
                });

            match self.runtime.hook_constructors(error_class, hook) {
                Ok(count) => {
                    info!("[*] Intercepting {count} constructors of {error_class}");
                    hooked += count;
                }
                Err(error) => {
                    self.attached.remove(error_class);
                    warn!("[!] Cannot intercept {error_class}: {error}");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) if hooked == 0 => Err(error),
            _ => Ok(hooked),
        }
    }

    /// Runs the pipeline for `event`, records the report, then runs `original`.
    pub fn intercept<T>(&self, event: &ErrorEvent, original: impl FnOnce() -> T) -> T {
        let report = self.handle(event);
        self.record(report);
        original()
    }

    /// Runs the pipeline for `event` inside the guard.
    ///
    /// Never fails and never panics; internal failures end up in
    /// [`PipelineReport::failure`].
    pub fn handle(&self, event: &ErrorEvent) -> PipelineReport {
        let mut report = PipelineReport::new(event);

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run(event, &mut report)))
            .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));

        if let Err(failure) = result {
            error!(
                "[x] Fallback patching failed for {} ({}): {failure}",
                event.error_class, event.message
            );
            report.failure = Some(failure.to_string());
        }

        report
    }

    fn record(&self, report: PipelineReport) {
        let capacity = self.config.report_history as u64;
        if capacity == 0 {
            return;
        }

        let sequence = self.next_report.fetch_add(1, Ordering::Relaxed);
        self.reports.insert(sequence, report);

        if let Some(evicted) = sequence.checked_sub(capacity) {
            self.reports.remove(&evicted);
        }
        // Concurrent recorders may insert behind an eviction.
        if self.reports.len() as u64 > capacity {
            let floor = (sequence + 1).saturating_sub(capacity);
            self.reports.retain(|retained, _| *retained >= floor);
        }
    }

    fn run(&self, event: &ErrorEvent, report: &mut PipelineReport) -> Result<()> {
        let frames = self.runtime.stack_trace()?;
        let thrower = locate_thrower(&event.error_class, &frames)?.clone();
        report.thrower = Some(thrower.clone());

        info!("[*] Unexpected TLS failure in {thrower}: {event}");

        let class = ClassSignature::inspect(self.runtime.class(&thrower.class_name)?.as_ref())?;
        let overloads: Vec<&MethodDescriptor> = class.overloads(&thrower.method_name).collect();
        if overloads.is_empty() {
            return Err(Error::MethodNotFound {
                class: thrower.class_name.clone(),
                method: thrower.method_name.clone(),
            });
        }

        let resolve = |name: &str| -> Result<ClassSignature> {
            ClassSignature::inspect(self.runtime.class(name)?.as_ref())
        };

        let decisions: Vec<(&MethodDescriptor, Result<Classification>)> = overloads
            .into_iter()
            .map(|method| {
                let decision = self.rules.classify(&RuleInput {
                    message: &event.message,
                    method,
                    class: &class,
                    config: &self.config,
                    resolve: &resolve,
                });
                (method, decision)
            })
            .collect();

        let group_patched = decisions
            .iter()
            .any(|(_, decision)| matches!(decision, Ok(c) if c.verdict.is_patch()));

        for (method, decision) in decisions {
            report.outcomes.push(self.apply(method, decision, group_patched));
        }

        Ok(())
    }

    fn apply(
        &self,
        method: &MethodDescriptor,
        decision: Result<Classification>,
        group_patched: bool,
    ) -> PatchOutcome {
        let Classification { rule, verdict } = match decision {
            Ok(classification) => classification,
            Err(error) => return failed(method, &error),
        };

        match verdict {
            Verdict::Patch(action) => {
                let replacement = action.build(&self.trust_manager);
                match self
                    .registry
                    .install(self.runtime.as_ref(), method, replacement)
                {
                    Ok(InstallOutcome::Installed(kind)) => PatchOutcome::Installed {
                        method: method.clone(),
                        rule,
                        kind,
                    },
                    Ok(InstallOutcome::AlreadyPatched(kind)) => PatchOutcome::AlreadyPatched {
                        method: method.clone(),
                        kind,
                    },
                    Err(error) => failed(method, &error),
                }
            }
            Verdict::Unrecognized(reason)
                if group_patched && reason == UnrecognizedReason::UnrecognizedTlsError =>
            {
                warn!(
                    "[!] Fallback patch not applied to {}: {reason} (sibling overload patched)",
                    method.display_name()
                );
                PatchOutcome::Skipped {
                    method: method.clone(),
                    reason,
                }
            }
            Verdict::Unrecognized(reason) => {
                warn!(
                    "[!] Fallback patch not applied to {}: {reason} (rule {rule})",
                    method.display_name()
                );
                PatchOutcome::Unrecognized {
                    method: method.clone(),
                    rule,
                    reason,
                }
            }
        }
    }
}

fn failed(method: &MethodDescriptor, error: &Error) -> PatchOutcome {
    error!(
        "[x] Fallback patch failed for {}: {error}",
        method.display_name()
    );
    PatchOutcome::Failed {
        method: method.clone(),
        error: error.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
