//! Exactly-once installation of replacements.

use dashmap::{mapref::entry::Entry, DashMap};
use log::{info, warn};

use crate::{
    patch::{PatchKind, Replacement},
    reflect::{MethodDescriptor, MethodKey},
    runtime::ManagedRuntime,
    Result,
};

/// A replacement that has been installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstalledPatch {
    /// The patched overload.
    pub method: MethodDescriptor,
    /// What the replacement does.
    pub kind: PatchKind,
}

/// Result of an installation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The replacement was installed by this call.
    Installed(PatchKind),
    /// A replacement was already in place; nothing was changed.
    ///
    /// Seeing this means the patched overload was not the cause of the failure, since
    /// the error is still being raised.
    AlreadyPatched(PatchKind),
}

/// Tracks which overloads carry a replacement.
///
/// The registry is the single source of truth for "has this overload been patched". The
/// check and the host-side installation happen while the map entry for the overload is
/// locked, so concurrent pipelines racing on the same overload install exactly once.
///
/// # Examples
///
/// ```rust
/// use certfallback::patch::{InstallOutcome, PatchKind, PatchRegistry, Replacement};
/// use certfallback::reflect::MethodDescriptor;
/// use certfallback::runtime::{ClassDef, MemoryRuntime, Value};
///
/// let runtime = MemoryRuntime::new();
/// runtime.define(
///     ClassDef::builder("a.Pinner")
///         .method("check", ["java.lang.String", "java.util.List"], "void", |_, _, _| Ok(Value::Void))
///         .build(),
/// );
/// let method = MethodDescriptor::new("a.Pinner", "check", ["java.lang.String", "java.util.List"], "void");
///
/// let registry = PatchRegistry::new();
/// let first = registry.install(&runtime, &method, Replacement::no_op())?;
/// let second = registry.install(&runtime, &method, Replacement::no_op())?;
///
/// assert_eq!(first, InstallOutcome::Installed(PatchKind::NoOp));
/// assert_eq!(second, InstallOutcome::AlreadyPatched(PatchKind::NoOp));
/// # Ok::<(), certfallback::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct PatchRegistry {
    installed: DashMap<MethodKey, InstalledPatch>,
}

impl PatchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `replacement` on `method` unless a replacement is already in place.
    ///
    /// # Errors
    ///
    /// Returns the host's error if it refuses the installation. The overload is then left
    /// unpatched and not recorded, so a later occurrence may try again.
    pub fn install(
        &self,
        runtime: &dyn ManagedRuntime,
        method: &MethodDescriptor,
        replacement: Replacement,
    ) -> Result<InstallOutcome> {
        match self.installed.entry(method.key()) {
            Entry::Occupied(existing) => {
                let kind = existing.get().kind;
                warn!(
                    "[!] {} was already patched ({kind}) but is still failing",
                    method.display_name()
                );
                Ok(InstallOutcome::AlreadyPatched(kind))
            }
            Entry::Vacant(slot) => {
                let kind = replacement.kind();
                runtime.install_replacement(method, replacement)?;
                slot.insert(InstalledPatch {
                    method: method.clone(),
                    kind,
                });
                info!(
                    "[+] Fallback {kind} patch installed for {}",
                    method.display_name()
                );
                Ok(InstallOutcome::Installed(kind))
            }
        }
    }

    /// Returns `true` if `key` carries a replacement.
    #[must_use]
    pub fn is_installed(&self, key: &MethodKey) -> bool {
        self.installed.contains_key(key)
    }

    /// The patch installed on `key`, if any.
    #[must_use]
    pub fn get(&self, key: &MethodKey) -> Option<InstalledPatch> {
        self.installed.get(key).map(|p| p.value().clone())
    }

    /// All installed patches, ordered by overload key.
    #[must_use]
    pub fn installed(&self) -> Vec<InstalledPatch> {
        let mut patches: Vec<(MethodKey, InstalledPatch)> = self
            .installed
            .iter()
            .map(|p| (p.key().clone(), p.value().clone()))
            .collect();
        patches.sort_by(|a, b| a.0.cmp(&b.0));
        patches.into_iter().map(|(_, p)| p).collect()
    }

    /// Number of patched overloads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.installed.len()
    }

    /// Returns `true` if nothing has been patched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}
