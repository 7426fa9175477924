//! Trust-manager collaborator boundary.
//!
//! The trust-manager replacement rules never decide on their own whether a chain is
//! acceptable; they delegate to a [`TrustManager`] supplied by the surrounding system.
//! [`PinnedTrustStore`] is a simple implementation accepting chains that contain one of a
//! configured set of anchor certificates.

mod store;

pub use store::{fingerprint, PinnedTrustStore};

use crate::Result;

/// An encoded X.509 certificate as passed through the host runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Certificate {
    /// Subject distinguished name, for diagnostics.
    pub subject: String,
    /// DER encoding.
    pub der: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate from its subject and DER bytes.
    #[must_use]
    pub fn new(subject: impl Into<String>, der: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            der: der.into(),
        }
    }
}

/// A component capable of deciding whether a certificate chain is acceptable.
///
/// # Thread Safety
///
/// Installed replacements hold the trust manager and may be invoked from any host thread.
pub trait TrustManager: Send + Sync {
    /// Validates `chain` for a server using key-exchange algorithm `auth_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CertificateRejected`](crate::Error::CertificateRejected) (or any
    /// other error) when the chain is not trusted.
    fn check_server_trusted(&self, chain: &[Certificate], auth_type: &str) -> Result<()>;
}
