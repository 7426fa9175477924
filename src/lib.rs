// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # certfallback
//!
//! A last-resort fallback for certificate-validation bypasses inside an instrumented
//! managed runtime.
//!
//! Explicit hooks cover the pinning and trust-manager implementations one knows about.
//! Everything else surfaces as a validation error. `certfallback` watches the
//! constructors of those errors, finds the method that raised one by walking the call
//! stack, matches that method's signature against a small set of known shapes, and hot
//! patches it so that the next call succeeds. The first occurrence still fails.
//!
//! ## Pipeline
//!
//! ```text
//! error constructor ──► locate thrower ──► inspect class ──► classify overloads ──► install
//!        │                 (stack)           (reflect)          (classify)          (patch)
//!        └──────────────────────────── original constructor always runs ◄──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use certfallback::prelude::*;
//! use certfallback::config::{CERTIFICATE_EXCEPTION, X509_TRUST_MANAGER};
//!
//! let runtime = Arc::new(MemoryRuntime::with_platform_classes());
//! runtime.define(
//!     ClassDef::builder("com.example.PinningTrustManager")
//!         .implements(X509_TRUST_MANAGER)
//!         .method(
//!             "checkServerTrusted",
//!             ["[Ljava.security.cert.X509Certificate;", "java.lang.String"],
//!             "void",
//!             |rt, _, _| Err(rt.throw(CERTIFICATE_EXCEPTION, "pin mismatch")),
//!         )
//!         .build(),
//! );
//!
//! let proxy_ca = Certificate::new("CN=Proxy CA", vec![1, 2, 3]);
//! let store = PinnedTrustStore::new().with_anchor(&proxy_ca);
//! let patcher = Arc::new(FallbackPatcher::new(runtime.clone(), Arc::new(store)));
//! patcher.attach()?;
//!
//! let manager = runtime.new_object("com.example.PinningTrustManager", Vec::<(&str, Value)>::new())?;
//! let args = [Value::certificate_array([proxy_ca]), Value::string("RSA")];
//!
//! // First call: still fails, but the method gets patched.
//! assert!(runtime.call(&manager, "checkServerTrusted", &args).is_err());
//! assert_eq!(patcher.registry().len(), 1);
//!
//! // Second call: delegated to the pinned store, which accepts the proxy CA.
//! assert!(runtime.call(&manager, "checkServerTrusted", &args).is_ok());
//! # Ok::<(), certfallback::Error>(())
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade. Installed patches and
//! detections are logged at `info`, unrecognized (including skipped sibling overloads) and
//! already-patched failures at `warn`, and contained pipeline failures at `error`. The
//! most recent reports are available as [`intercept::PipelineReport`] values.
//!
//! ## Modules
//!
//! - [`intercept`] - Constructor interception and the pipeline
//! - [`stack`] - Locating the frame that raised an error
//! - [`reflect`] - Reflective class inspection
//! - [`chain`] - Interceptor-chain shape matching
//! - [`classify`] - The ordered rule set
//! - [`patch`] - Replacements and exactly-once installation
//! - [`runtime`] - The host runtime adapter and an in-memory implementation
//! - [`trust`] - The trust-manager collaborator
//! - [`config`] - Intercepted classes and type names

mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use certfallback::prelude::*;
///
/// let config = FallbackConfig::minimal();
/// let rules = RuleSet::standard();
/// assert_eq!(rules.rules().len(), 6);
/// assert_eq!(config.error_classes.len(), 1);
/// ```
pub mod prelude;

pub mod chain;
pub mod classify;
pub mod config;
pub mod intercept;
pub mod patch;
pub mod reflect;
pub mod runtime;
pub mod stack;
pub mod trust;

/// `certfallback` Result type
pub type Result<T> = std::result::Result<T, Error>;

/// `certfallback` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the categories.
pub use error::{Error, ThrownError};

/// Top-level pipeline configuration.
pub use config::FallbackConfig;

/// The interception orchestrator, main entry point of the crate.
pub use intercept::FallbackPatcher;
