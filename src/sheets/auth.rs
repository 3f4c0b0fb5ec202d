//! Credentials for the remote spreadsheet API.
//!
//! The pipeline only needs "a valid credential is available". How the token
//! was obtained (browser consent flow, service account, CLI login) lives
//! outside this crate behind [`CredentialProvider`].

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced while obtaining a credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential is configured.
    #[error("no credential available: {0}")]
    Missing(String),

    /// A credential was found but cannot be used.
    #[error("credential rejected: {0}")]
    Rejected(String),
}

/// An OAuth bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Source of credentials for API calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a credential or fail with [`AuthError`].
    async fn authenticate(&self) -> Result<Credential, AuthError>;
}

/// A fixed token supplied up front.
#[derive(Debug, Clone)]
pub struct StaticToken(Credential);

impl StaticToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self(Credential::bearer(access_token))
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        if self.0.access_token.trim().is_empty() {
            return Err(AuthError::Rejected("token is empty".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// A token read from an environment variable on every call, so an external
/// refresher can rotate it while the process runs.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvToken {
    async fn authenticate(&self) -> Result<Credential, AuthError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(Credential::bearer(token)),
            Ok(_) => Err(AuthError::Rejected(format!("{} is empty", self.var))),
            Err(_) => Err(AuthError::Missing(format!("{} is not set", self.var))),
        }
    }
}
