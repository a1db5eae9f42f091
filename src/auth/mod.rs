//! Caller authentication: per-user API keys plus the bootstrap admin key.

mod extractor;

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub use extractor::{AdminAuth, ApiKeyAuth, AuthError};

/// The bootstrap admin key, kept as a `SecretString`.
///
/// `Debug` prints `[REDACTED]`; the value is zeroed on drop.
#[derive(Clone)]
pub struct AdminKey(Option<SecretString>);

impl AdminKey {
    /// Create a new AdminKey from an optional string.
    pub fn new(key: Option<String>) -> Self {
        Self(key.map(SecretString::from))
    }

    /// Securely compare the provided key with the stored admin key.
    ///
    /// Uses `subtle::ConstantTimeEq`; unequal lengths compare false without an early exit.
    pub fn verify(&self, provided: &str) -> bool {
        match &self.0 {
            Some(secret) => {
                let expected = secret.expose_secret();
                expected.as_bytes().ct_eq(provided.as_bytes()).into()
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(_) => write!(f, "AdminKey([REDACTED])"),
            None => write!(f, "AdminKey(None)"),
        }
    }
}
