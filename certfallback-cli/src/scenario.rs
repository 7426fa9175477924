//! Recorded validation failures for the `replay` command.
//!
//! A scenario is a JSON dump of what a failing run looked like: the error that was
//! constructed, the call stack beneath it (innermost first, starting at the frame that
//! raised the error), and the reflected shape of every class the classifier may look at.
//!
//! ```json
//! {
//!   "error_class": "java.security.cert.CertificateException",
//!   "message": "Certificate transparency failed",
//!   "stack": [
//!     { "class": "a.b.C", "method": "verify" },
//!     { "class": "okhttp3.internal.http.RealInterceptorChain", "method": "proceed" }
//!   ],
//!   "classes": [
//!     {
//!       "name": "a.b.C",
//!       "methods": [{ "name": "verify", "arguments": ["a.b.Chain"], "returns": "a.b.Response" }]
//!     }
//!   ],
//!   "trust_anchors": []
//! }
//! ```

use std::{fs, path::Path};

use anyhow::Context;
use certfallback::{
    runtime::{ClassDef, MemoryRuntime},
    stack::StackFrame,
    trust::PinnedTrustStore,
};
use serde::{Deserialize, Serialize};

/// One recorded stack frame.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FrameSpec {
    pub class: String,
    pub method: String,
}

/// One declared field.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One declared method overload.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default = "void")]
    pub returns: String,
}

/// The reflected shape of one class.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

/// A recorded validation failure.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Scenario {
    pub error_class: String,
    #[serde(default)]
    pub message: String,
    pub stack: Vec<FrameSpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    /// Hex SHA-256 fingerprints accepted by the replay's trust store.
    #[serde(default)]
    pub trust_anchors: Vec<String>,
}

fn void() -> String {
    "void".to_string()
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario: {}", path.display()))
    }

    /// A runtime holding the platform classes plus every recorded class.
    ///
    /// Recorded methods have no bodies; they only need to exist for reflection and
    /// patching.
    pub fn build_runtime(&self) -> MemoryRuntime {
        let runtime = MemoryRuntime::with_platform_classes();
        for class in &self.classes {
            runtime.define(class_def(class));
        }
        runtime
    }

    /// The recorded stack, innermost first.
    pub fn frames(&self) -> Vec<StackFrame> {
        self.stack
            .iter()
            .map(|frame| StackFrame::new(frame.class.clone(), frame.method.clone()))
            .collect()
    }

    /// A trust store pinning the recorded anchors.
    pub fn trust_store(&self) -> PinnedTrustStore {
        self.trust_anchors
            .iter()
            .fold(PinnedTrustStore::new(), |store, anchor| {
                store.with_fingerprint(anchor)
            })
    }
}

fn class_def(class: &ClassSpec) -> ClassDef {
    let mut builder = ClassDef::builder(class.name.clone());
    if let Some(superclass) = &class.superclass {
        builder = builder.extends(superclass.clone());
    }
    for interface in &class.interfaces {
        builder = builder.implements(interface.clone());
    }
    for field in &class.fields {
        builder = builder.field(field.name.clone(), field.type_name.clone());
    }
    for method in &class.methods {
        builder = builder.abstract_method(
            method.name.clone(),
            method.arguments.iter().cloned(),
            method.returns.clone(),
        );
    }
    builder.build()
}
