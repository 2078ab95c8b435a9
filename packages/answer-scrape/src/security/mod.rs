//! Credential handling.

pub mod credentials;

pub use credentials::{ApiSecret, ProviderCredentials};
