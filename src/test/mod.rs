//! Shared fixtures for unit tests.

mod factories;

pub use factories::*;
pub use logger::*;
pub use trust::*;

pub const STRING: &str = "java.lang.String";
pub const CERT_ARRAY: &str = "[Ljava.security.cert.X509Certificate;";
pub const LIST: &str = "java.util.List";
