use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::{
    trust::{Certificate, TrustManager},
    Error, Result,
};

/// Returns the lowercase hex SHA-256 fingerprint of a certificate's DER encoding.
///
/// # Examples
///
/// ```rust
/// use certfallback::trust::{fingerprint, Certificate};
///
/// let cert = Certificate::new("CN=test", b"".to_vec());
/// assert_eq!(
///     fingerprint(&cert),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn fingerprint(certificate: &Certificate) -> String {
    Sha256::digest(&certificate.der)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// A trust manager that accepts any chain containing a pinned anchor certificate.
///
/// Anchors are identified by SHA-256 fingerprint. The auth type is not inspected.
///
/// # Examples
///
/// ```rust
/// use certfallback::trust::{Certificate, PinnedTrustStore, TrustManager};
///
/// let proxy_ca = Certificate::new("CN=Proxy CA", vec![1, 2, 3]);
/// let store = PinnedTrustStore::new().with_anchor(&proxy_ca);
///
/// let leaf = Certificate::new("CN=example.com", vec![9, 9, 9]);
/// assert!(store.check_server_trusted(&[leaf.clone(), proxy_ca], "RSA").is_ok());
/// assert!(store.check_server_trusted(&[leaf], "RSA").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct PinnedTrustStore {
    anchors: HashSet<String>,
}

impl PinnedTrustStore {
    /// Creates an empty store, which rejects everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins `certificate` as a trust anchor.
    #[must_use]
    pub fn with_anchor(mut self, certificate: &Certificate) -> Self {
        self.anchors.insert(fingerprint(certificate));
        self
    }

    /// Pins a hex SHA-256 fingerprint as a trust anchor. Case-insensitive; `:` separators
    /// are ignored.
    #[must_use]
    pub fn with_fingerprint(mut self, hex: &str) -> Self {
        let normalized: String = hex
            .chars()
            .filter(|c| *c != ':')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        self.anchors.insert(normalized);
        self
    }

    /// Number of pinned anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// Returns `true` if no anchor is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

impl TrustManager for PinnedTrustStore {
    fn check_server_trusted(&self, chain: &[Certificate], _auth_type: &str) -> Result<()> {
        if chain.is_empty() {
            return Err(Error::CertificateRejected("empty certificate chain".to_string()));
        }

        if chain.iter().any(|c| self.anchors.contains(&fingerprint(c))) {
            return Ok(());
        }

        Err(Error::CertificateRejected(format!(
            "no trusted anchor in chain for {}",
            chain[0].subject
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalization() {
        let cert = Certificate::new("CN=a", vec![0xAA]);
        let hex = fingerprint(&cert);
        let colon: String = hex
            .to_uppercase()
            .as_bytes()
            .chunks(2)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join(":");

        let store = PinnedTrustStore::new().with_fingerprint(&colon);
        assert_eq!(store.len(), 1);
        assert!(store.check_server_trusted(&[cert], "ECDHE_RSA").is_ok());
    }

    #[test]
    fn test_empty_chain_rejected() {
        let store = PinnedTrustStore::new().with_anchor(&Certificate::new("CN=a", vec![1]));
        assert!(matches!(
            store.check_server_trusted(&[], "RSA"),
            Err(Error::CertificateRejected(_))
        ));
    }

    #[test]
    fn test_empty_store_rejects() {
        let store = PinnedTrustStore::new();
        assert!(store.is_empty());
        assert!(store
            .check_server_trusted(&[Certificate::new("CN=a", vec![1])], "RSA")
            .is_err());
    }
}
