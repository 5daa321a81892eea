//! OpenPass Core Library
//!
//! Platform-independent core of the OpenPass password manager:
//! - **field_classifier**: Guesses username/password fields on an unannotated screen
//! - **credential_matcher**: Domain canonicalization and domain-scoped fill suggestions
//! - **auth_gate**: Session unlock and per-suggestion authentication state machines
//! - **envelope**: AES-GCM at-rest encryption and PBKDF2 passphrase envelopes
//! - **vault**: Credential entries, the store seam and the repository over it
//! - **backup**: Passphrase-protected export/import of the whole vault
//! - **autofill**: The host-facing fill request / authenticate flow
//! - **settings**: User preferences with app-lock and biometric rules
//! - **generator**: Random password generation with a strength rating
//!
//! Hosts (Android service, browser extension, desktop) supply the screen
//! tree, the platform authenticator, the key store and persistent storage.
//! Everything else happens here.
//!
//! # Example (conceptual)
//! ```ignore
//! let vault = Arc::new(PasswordVault::new(store, Arc::new(InstallationCipher::new(keys))));
//! let autofill = AutofillService::new(vault.clone(), authenticator);
//!
//! // Offer suggestions, nothing secret leaves the vault yet
//! let response = autofill.handle_fill_request(request, Some(cancel)).await?;
//!
//! // User picked one: authenticate, then decrypt and fill
//! let result = autofill.authenticate_suggestion(&suggestion.token).await?;
//! ```

pub mod auth_gate;
pub mod autofill;
pub mod backup;
pub mod credential_matcher;
pub mod envelope;
pub mod error;
pub mod field_classifier;
pub mod generator;
pub mod settings;
pub mod vault;

pub use auth_gate::{
    AppLockSecret, AuthErrorCode, AuthOutcome, AuthPrompt, Authenticator, GrantedSuggestion,
    SessionGate, SessionState,
};
pub use autofill::{AuthenticationResult, AutofillService, FillRequest, FillResponse, FillValues};
pub use backup::{export_backup, import_backup, BackupData, BackupEntry, ImportStats};
pub use credential_matcher::{
    base_domain, canonicalize, match_credentials, ChallengeToken, FillSuggestion, FillTarget,
    RequestNonce,
};
pub use envelope::{
    decrypt, derive_key, encrypt, open_with_passphrase, seal_with_passphrase, EncryptedEnvelope,
    InstallationCipher, KeyStore, MemoryKeyStore, SecretCipher, SecretString,
};
pub use error::{VaultError, VaultResult};
pub use field_classifier::{classify, ClassificationResult, FieldHandle, ScreenNode};
pub use generator::{generate_password, GeneratedPassword, GeneratorOptions, PasswordStrength};
pub use settings::{MemorySettingsStore, Settings, SettingsStore};
pub use vault::{CredentialEntry, MemoryVaultStore, NewCredential, PasswordVault, SortOrder, VaultStore};

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for the Android JNI shim and .NET P/Invoke
#[cfg(feature = "ffi")]
pub mod ffi;
