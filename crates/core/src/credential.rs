//! OpenAI credential validation.

use secrecy::{ExposeSecret, SecretString};

/// Every usable OpenAI secret key starts with this prefix.
pub const API_KEY_PREFIX: &str = "sk-";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("OPENAI_API_KEY is missing")]
    Missing,
    #[error("OPENAI_API_KEY does not start with '{}'", API_KEY_PREFIX)]
    Malformed,
}

/// A credential that has passed the presence and prefix check.
///
/// The key is held as a `SecretString`, so `Debug` output never contains it.
#[derive(Debug)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn parse(raw: Option<&str>) -> Result<Self, CredentialError> {
        let raw = raw
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(CredentialError::Missing)?;
        if !raw.starts_with(API_KEY_PREFIX) {
            return Err(CredentialError::Malformed);
        }
        Ok(Self(SecretString::from(raw.to_string())))
    }

    /// Same as [`ApiKey::parse`], for a key already held as a secret.
    pub fn from_secret(secret: Option<&SecretString>) -> Result<Self, CredentialError> {
        Self::parse(secret.map(|s| s.expose_secret()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}
