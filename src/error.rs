//! Error types for the OpenPass core library.

use thiserror::Error;

/// Errors that can occur during vault operations.
///
/// Variants carry plain string messages so the error stays `Clone` and can be
/// handed across the FFI/WASM boundary unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Authentication tag mismatch while decrypting.
    #[error("Wrong password or corrupted data")]
    AuthFailure,

    /// Input that cannot even be handed to the cipher (bad base64, truncated blob).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Caller-supplied value rejected by a validation rule.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key derivation or key store failure
    #[error("Key error: {0}")]
    Key(String),

    /// No entry with this id
    #[error("Entry not found: {0}")]
    NotFound(i64),

    /// An entry with the same service name already exists
    #[error("An entry for service '{0}' already exists")]
    DuplicateService(String),

    /// Vault store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Reading or writing a backup document failed
    #[error("IO error: {0}")]
    Io(String),

    /// The operation needs an unlocked session
    #[error("Vault is locked")]
    Locked,

    /// A gate was asked to move along an edge its state machine does not have
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// General error
    #[error("Error: {0}")]
    General(String),
}

impl VaultError {
    /// True when the failure means "wrong password or tampered data".
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, VaultError::AuthFailure)
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::JsonError(err.to_string())
    }
}

impl From<base64::DecodeError> for VaultError {
    fn from(err: base64::DecodeError) -> Self {
        VaultError::MalformedInput(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Io(err.to_string())
    }
}

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
