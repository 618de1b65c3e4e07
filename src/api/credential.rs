//! PAT-based credential for the Azure DevOps REST API.
//!
//! Azure DevOps accepts a Personal Access Token as the password of HTTP Basic
//! authentication with an empty user name.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};

/// PAT-based credential for Azure DevOps authentication.
///
/// The PAT is stored as a `SecretString` and only exposed while the
/// `Authorization` header is built.
///
/// # Example
///
/// ```rust
/// use adowork::api::PatCredential;
///
/// let credential = PatCredential::from_string("my-pat".to_string());
/// assert!(credential.authorization_header().starts_with("Basic "));
/// ```
#[derive(Clone)]
pub struct PatCredential {
    pat: SecretString,
}

impl PatCredential {
    /// Creates a new PAT credential from a SecretString.
    pub fn new(pat: SecretString) -> Self {
        Self { pat }
    }

    /// Creates a new PAT credential from a plain string.
    pub fn from_string(pat: String) -> Self {
        Self {
            pat: SecretString::from(pat),
        }
    }

    /// Value for the `Authorization` header: `Basic base64(":" + pat)`.
    pub fn authorization_header(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!(":{}", self.pat.expose_secret()));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for PatCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredential")
            .field("pat", &"[REDACTED]")
            .finish()
    }
}
