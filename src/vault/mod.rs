//! Credential entries and the repository that owns them.
//!
//! [`PasswordVault`] is the only way in or out of the store. Passwords are
//! encrypted through a [`SecretCipher`] before they reach the [`VaultStore`],
//! and come back out only through:
//! 1. [`PasswordVault::reveal_for_fill`], which demands a [`GrantedSuggestion`]
//! 2. [`PasswordVault::reveal_password`], which demands an unlocked [`SessionGate`]
//! 3. crate-internal backup export

mod store;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::auth_gate::{GrantedSuggestion, SessionGate};
use crate::credential_matcher::service_matches_domain;
use crate::envelope::{SecretCipher, SecretString};
use crate::error::{VaultError, VaultResult};

pub use store::{MemoryVaultStore, VaultStore};

/// One stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    pub id: i64,
    pub service_name: String,
    pub username: String,
    /// Opaque blob from [`SecretCipher::encrypt_secret`].
    pub encrypted_password: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

/// List ordering. Pinned entries always come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Service name ascending, case-insensitive.
    #[default]
    Name,
    /// Newest first.
    Date,
}

/// Sort in place: pinned first, then by `order`.
pub fn sort_entries(entries: &mut [CredentialEntry], order: SortOrder) {
    entries.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| match order {
                SortOrder::Name => compare_names(&a.service_name, &b.service_name),
                SortOrder::Date => b.created_at.cmp(&a.created_at),
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Plaintext form of an entry being created or edited.
#[derive(Clone)]
pub struct NewCredential {
    pub service_name: String,
    pub username: String,
    pub password: SecretString,
    pub notes: Option<String>,
}

impl NewCredential {
    pub fn new(service_name: impl Into<String>, username: impl Into<String>, password: &str) -> Self {
        Self {
            service_name: service_name.into(),
            username: username.into(),
            password: Zeroizing::new(password.to_string()),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Blank notes are stored as absent.
    fn normalized_notes(&self) -> Option<String> {
        self.notes.clone().filter(|n| !n.trim().is_empty())
    }
}

impl fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewCredential")
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("notes", &self.notes)
            .finish()
    }
}

/// Repository over a [`VaultStore`] and a [`SecretCipher`].
pub struct PasswordVault {
    store: Arc<dyn VaultStore>,
    cipher: Arc<dyn SecretCipher>,
}

impl PasswordVault {
    pub fn new(store: Arc<dyn VaultStore>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { store, cipher }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Reads
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn entries(&self, order: SortOrder) -> VaultResult<Vec<CredentialEntry>> {
        self.store.list(order).await
    }

    /// Entries whose service name contains `domain`, case-insensitive.
    pub async fn entries_for_domain(&self, domain: &str) -> VaultResult<Vec<CredentialEntry>> {
        Ok(self
            .store
            .list(SortOrder::Name)
            .await?
            .into_iter()
            .filter(|entry| service_matches_domain(&entry.service_name, domain))
            .collect())
    }

    pub async fn get_entry(&self, id: i64) -> VaultResult<Option<CredentialEntry>> {
        self.store.get(id).await
    }

    pub async fn find_by_service_name(&self, service_name: &str) -> VaultResult<Option<CredentialEntry>> {
        self.store.find_by_service_name(service_name).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Writes
    // ═══════════════════════════════════════════════════════════════════════════

    /// Rejects blank service names and case-insensitive duplicates of other entries.
    async fn validate(&self, credential: &NewCredential, own_id: Option<i64>) -> VaultResult<()> {
        if credential.service_name.trim().is_empty() {
            return Err(VaultError::InvalidInput(
                "Service name cannot be empty.".to_string(),
            ));
        }
        if let Some(existing) = self.store.find_by_service_name(&credential.service_name).await? {
            if Some(existing.id) != own_id {
                return Err(VaultError::DuplicateService(credential.service_name.clone()));
            }
        }
        Ok(())
    }

    /// Encrypt and store without validation.
    pub(crate) async fn insert_unchecked(&self, credential: &NewCredential) -> VaultResult<i64> {
        let encrypted_password = self.cipher.encrypt_secret(&credential.password)?;
        let entry = CredentialEntry {
            id: 0,
            service_name: credential.service_name.clone(),
            username: credential.username.clone(),
            encrypted_password,
            notes: credential.normalized_notes(),
            is_pinned: false,
            created_at: Utc::now(),
        };
        let id = self.store.insert(entry).await?;
        debug!(id, "inserted entry");
        Ok(id)
    }

    pub async fn insert_entry(&self, credential: &NewCredential) -> VaultResult<i64> {
        self.validate(credential, None).await?;
        self.insert_unchecked(credential).await
    }

    /// Replace an entry's fields. Pinned state and creation time are kept.
    pub async fn update_entry(&self, id: i64, credential: &NewCredential) -> VaultResult<()> {
        let original = self.store.get(id).await?.ok_or(VaultError::NotFound(id))?;
        self.validate(credential, Some(id)).await?;

        let encrypted_password = self.cipher.encrypt_secret(&credential.password)?;
        self.store
            .update(CredentialEntry {
                id,
                service_name: credential.service_name.clone(),
                username: credential.username.clone(),
                encrypted_password,
                notes: credential.normalized_notes(),
                is_pinned: original.is_pinned,
                created_at: original.created_at,
            })
            .await?;
        debug!(id, "updated entry");
        Ok(())
    }

    pub async fn delete_entry(&self, id: i64) -> VaultResult<()> {
        self.store.delete(id).await?;
        debug!(id, "deleted entry");
        Ok(())
    }

    /// Flip the pinned flag and return the new value.
    pub async fn toggle_pin(&self, id: i64) -> VaultResult<bool> {
        let entry = self.store.get(id).await?.ok_or(VaultError::NotFound(id))?;
        let pinned = !entry.is_pinned;
        self.store.set_pinned(id, pinned).await?;
        Ok(pinned)
    }

    /// Save a credential the user typed into another app.
    ///
    /// Service, username and password must all be non-blank. Updates
    /// `existing_id` when given, otherwise the entry with the same service
    /// name, otherwise inserts.
    pub async fn save_from_autofill(
        &self,
        service_name: &str,
        username: &str,
        password: &str,
        existing_id: Option<i64>,
    ) -> VaultResult<i64> {
        if service_name.trim().is_empty() || username.trim().is_empty() || password.trim().is_empty() {
            return Err(VaultError::InvalidInput(
                "Service, username and password are required.".to_string(),
            ));
        }

        let credential = NewCredential::new(service_name, username, password);
        let target = match existing_id {
            Some(id) => Some(id),
            None => self
                .store
                .find_by_service_name(service_name)
                .await?
                .map(|entry| entry.id),
        };

        match target {
            Some(id) => {
                let notes = self.store.get(id).await?.and_then(|entry| entry.notes);
                let credential = NewCredential { notes, ..credential };
                self.update_entry(id, &credential).await?;
                info!(id, "updated entry from autofill save");
                Ok(id)
            }
            None => {
                let id = self.insert_entry(&credential).await?;
                info!(id, "saved new entry from autofill");
                Ok(id)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Secret release
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn decrypt_password(&self, entry: &CredentialEntry) -> VaultResult<SecretString> {
        self.cipher.decrypt_secret(&entry.encrypted_password)
    }

    /// Decrypt the entry behind an authenticated suggestion.
    ///
    /// `Ok(None)` if the entry was deleted since the suggestion was made.
    pub async fn reveal_for_fill(
        &self,
        grant: &GrantedSuggestion,
    ) -> VaultResult<Option<(CredentialEntry, SecretString)>> {
        let id = grant.target().entry_id;
        let Some(entry) = self.store.get(id).await? else {
            warn!(id, "granted suggestion refers to a missing entry");
            return Ok(None);
        };
        let password = self.decrypt_password(&entry)?;
        Ok(Some((entry, password)))
    }

    /// Decrypt a password for display in the unlocked app.
    pub async fn reveal_password(&self, session: &SessionGate, id: i64) -> VaultResult<SecretString> {
        session.ensure_unlocked()?;
        let entry = self.store.get(id).await?.ok_or(VaultError::NotFound(id))?;
        self.decrypt_password(&entry)
    }
}
