//! Fallback configuration types.
//!
//! This module holds everything about the host platform that the pipeline compares
//! against by name: which error classes are intercepted, which interface marks a class
//! as a trust manager, and the fully-qualified type names used by the signature rules.
//!
//! # Configuration Presets
//!
//! - [`FallbackConfig::android()`] - The default; intercepts peer-unverified and certificate errors
//! - [`FallbackConfig::minimal()`] - Intercepts certificate errors only
//!
//! # Example
//!
//! ```rust
//! use certfallback::FallbackConfig;
//!
//! let config = FallbackConfig::android()
//!     .with_error_class("com.example.CustomPinningException");
//!
//! assert_eq!(config.error_classes.len(), 3);
//! assert_eq!(config.type_names.string, "java.lang.String");
//! ```

/// Fully-qualified class name of the peer-identity-unverified error.
pub const PEER_UNVERIFIED_EXCEPTION: &str = "javax.net.ssl.SSLPeerUnverifiedException";

/// Fully-qualified class name of the generic certificate error.
pub const CERTIFICATE_EXCEPTION: &str = "java.security.cert.CertificateException";

/// Fully-qualified name of the certificate trust-manager capability.
pub const X509_TRUST_MANAGER: &str = "javax.net.ssl.X509TrustManager";

/// Message prefix raised by OkHttp-style certificate pinners.
///
/// This is a contract with the upstream error producer and is compared byte-for-byte.
pub const PINNING_FAILURE_PREFIX: &str = "Certificate pinning failure!";

/// Exact message raised by certificate-transparency interceptors.
///
/// This is a contract with the upstream error producer and is compared byte-for-byte.
pub const TRANSPARENCY_FAILURE_MESSAGE: &str = "Certificate transparency failed";

/// Name of the trust-manager validation method.
pub const CHECK_SERVER_TRUSTED: &str = "checkServerTrusted";

/// Default number of pipeline reports a patcher retains.
pub const DEFAULT_REPORT_HISTORY: usize = 64;

/// Fully-qualified type names the classification rules compare against.
///
/// Type names are compared as plain strings, never structurally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeNames {
    /// The platform string type.
    pub string: String,
    /// The certificate array type, in the runtime's binary array notation.
    pub certificate_array: String,
    /// The list type returned by the extended trust-manager overload.
    pub list: String,
    /// The void return type.
    pub void: String,
}

impl Default for TypeNames {
    fn default() -> Self {
        Self {
            string: "java.lang.String".to_string(),
            certificate_array: "[Ljava.security.cert.X509Certificate;".to_string(),
            list: "java.util.List".to_string(),
            void: "void".to_string(),
        }
    }
}

/// Top-level configuration for the fallback pipeline.
///
/// # Default Configuration
///
/// The default is [`FallbackConfig::android()`]:
/// - intercepts [`PEER_UNVERIFIED_EXCEPTION`] and [`CERTIFICATE_EXCEPTION`]
/// - treats implementors of [`X509_TRUST_MANAGER`] as trust managers
/// - uses the Java type names from [`TypeNames::default()`]
///
/// # Example
///
/// ```rust
/// use certfallback::FallbackConfig;
///
/// let config = FallbackConfig {
///     trust_manager_interface: "com.example.TrustManager".to_string(),
///     ..FallbackConfig::minimal()
/// };
/// assert_eq!(config.error_classes, vec!["java.security.cert.CertificateException"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackConfig {
    /// Error classes whose every constructor overload is intercepted.
    pub error_classes: Vec<String>,

    /// Interface a class must be assignable to for the trust-manager rules to apply.
    pub trust_manager_interface: String,

    /// Type names used by the signature rules.
    pub type_names: TypeNames,

    /// How many pipeline reports a patcher retains, newest last. `0` disables recording.
    pub report_history: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self::android()
    }
}

impl FallbackConfig {
    /// Configuration for Android-style runtimes: both validation error types intercepted.
    #[must_use]
    pub fn android() -> Self {
        Self {
            error_classes: vec![
                PEER_UNVERIFIED_EXCEPTION.to_string(),
                CERTIFICATE_EXCEPTION.to_string(),
            ],
            trust_manager_interface: X509_TRUST_MANAGER.to_string(),
            type_names: TypeNames::default(),
            report_history: DEFAULT_REPORT_HISTORY,
        }
    }

    /// Configuration that only intercepts the generic certificate error.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            error_classes: vec![CERTIFICATE_EXCEPTION.to_string()],
            ..Self::android()
        }
    }

    /// Adds another error class to intercept. Duplicates are ignored.
    #[must_use]
    pub fn with_error_class(mut self, class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        if !self.error_classes.contains(&class_name) {
            self.error_classes.push(class_name);
        }
        self
    }

    /// Replaces the trust-manager interface name.
    #[must_use]
    pub fn with_trust_manager_interface(mut self, interface: impl Into<String>) -> Self {
        self.trust_manager_interface = interface.into();
        self
    }

    /// Replaces the type-name block.
    #[must_use]
    pub fn with_type_names(mut self, type_names: TypeNames) -> Self {
        self.type_names = type_names;
        self
    }

    /// Replaces the number of retained pipeline reports.
    #[must_use]
    pub fn with_report_history(mut self, reports: usize) -> Self {
        self.report_history = reports;
        self
    }

    /// Returns `true` if constructions of `class_name` are intercepted.
    #[must_use]
    pub fn intercepts(&self, class_name: &str) -> bool {
        self.error_classes.iter().any(|c| c == class_name)
    }
}
