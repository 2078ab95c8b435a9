//! Provider credentials with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive
//! values. Credentials are read eagerly from the process environment so a
//! missing variable fails with a clear error naming it, instead of a
//! mysterious 401 at submit time.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

use crate::error::{Result, ScrapeError};

/// An API secret that won't appear in logs or debug output.
pub struct ApiSecret(SecretBox<str>);

impl ApiSecret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Expose the secret for use in a request. Call only at the point of
    /// actually authenticating.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiSecret {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for ApiSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A username/secret pair for a scraping vendor's basic-auth API.
#[derive(Clone)]
pub struct ProviderCredentials {
    username: String,
    secret: ApiSecret,
}

impl ProviderCredentials {
    /// Create credentials from explicit values.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: ApiSecret::new(secret),
        }
    }

    /// Read credentials from the process environment.
    ///
    /// Fails with [`ScrapeError::MissingCredential`] naming the first
    /// variable that is unset or empty.
    pub fn from_env(username_var: &str, secret_var: &str) -> Result<Self> {
        let username = require_env(username_var)?;
        let secret = require_env(secret_var)?;
        Ok(Self::new(username, secret))
    }

    /// The account/login half of the pair.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The secret half of the pair, exposed for authentication.
    pub fn secret(&self) -> &str {
        self.secret.expose()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn require_env(variable: &str) -> Result<String> {
    match std::env::var(variable) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ScrapeError::MissingCredential {
            variable: variable.to_string(),
        }),
    }
}
