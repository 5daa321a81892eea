//! Passphrase-protected export and import of the whole vault.
//!
//! Document layout:
//! - outer: [`EncryptedEnvelope`] as JSON (`iv`, `salt`, `ciphertext`)
//! - inner plaintext: `{"entries": [{"serviceName", "username", "password", "notes"}]}`
//!
//! PBKDF2 derivation is CPU bound and runs on tokio's blocking pool.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::auth_gate::SessionGate;
use crate::envelope::{open_with_passphrase, seal_with_passphrase, EncryptedEnvelope};
use crate::error::{VaultError, VaultResult};
use crate::vault::{NewCredential, PasswordVault, SortOrder};

/// Shortest passphrase accepted for a backup.
pub const MIN_PASSPHRASE_LEN: usize = 4;

/// One entry in plaintext backup form. Wiped on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub service_name: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BackupData {
    pub entries: Vec<BackupEntry>,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
}

fn check_passphrase(passphrase: &str) -> VaultResult<()> {
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(VaultError::InvalidInput(format!(
            "backup passphrase must be at least {} characters",
            MIN_PASSPHRASE_LEN
        )));
    }
    Ok(())
}

async fn seal_blocking(plaintext: Zeroizing<Vec<u8>>, passphrase: &str) -> VaultResult<EncryptedEnvelope> {
    let passphrase = Zeroizing::new(passphrase.to_string());
    tokio::task::spawn_blocking(move || seal_with_passphrase(&plaintext, &passphrase))
        .await
        .map_err(|e| VaultError::General(format!("backup encryption task failed: {}", e)))?
}

async fn open_blocking(envelope: EncryptedEnvelope, passphrase: &str) -> VaultResult<Zeroizing<Vec<u8>>> {
    let passphrase = Zeroizing::new(passphrase.to_string());
    tokio::task::spawn_blocking(move || open_with_passphrase(&envelope, &passphrase))
        .await
        .map_err(|e| VaultError::General(format!("backup decryption task failed: {}", e)))?
}

/// Serialize every entry and seal it under `passphrase`.
///
/// Returns the envelope document as JSON.
pub async fn export_backup(vault: &PasswordVault, session: &SessionGate, passphrase: &str) -> VaultResult<String> {
    session.ensure_unlocked()?;
    check_passphrase(passphrase)?;

    let mut data = BackupData::default();
    for entry in vault.entries(SortOrder::Name).await? {
        let password = vault.decrypt_password(&entry)?;
        data.entries.push(BackupEntry {
            service_name: entry.service_name,
            username: entry.username,
            password: password.to_string(),
            notes: entry.notes,
        });
    }
    let count = data.entries.len();

    let plaintext = Zeroizing::new(serde_json::to_vec(&data)?);
    drop(data);

    let envelope = seal_blocking(plaintext, passphrase).await?;
    info!(entries = count, "exported backup");
    Ok(serde_json::to_string(&envelope)?)
}

/// Open a backup document and add every entry whose service name is new.
///
/// Service names are compared case-insensitively against the vault and
/// against entries already taken from this backup, so importing the same
/// document twice adds nothing the second time.
pub async fn import_backup(
    vault: &PasswordVault,
    session: &SessionGate,
    document: &str,
    passphrase: &str,
) -> VaultResult<ImportStats> {
    session.ensure_unlocked()?;

    let envelope: EncryptedEnvelope = serde_json::from_str(document)?;
    let plaintext = open_blocking(envelope, passphrase).await?;
    let data: BackupData = serde_json::from_slice(&plaintext)?;

    let mut known: HashSet<String> = vault
        .entries(SortOrder::Name)
        .await?
        .into_iter()
        .map(|entry| entry.service_name.to_lowercase())
        .collect();

    let mut stats = ImportStats::default();
    for entry in &data.entries {
        if !known.insert(entry.service_name.to_lowercase()) {
            stats.skipped += 1;
            continue;
        }
        let mut credential = NewCredential::new(entry.service_name.as_str(), entry.username.as_str(), &entry.password);
        credential.notes = entry.notes.clone();
        let id = vault.insert_unchecked(&credential).await?;
        debug!(id, "imported entry");
        stats.imported += 1;
    }

    info!(imported = stats.imported, skipped = stats.skipped, "imported backup");
    Ok(stats)
}

/// [`export_backup`] straight to a file.
pub async fn export_backup_to_path(
    vault: &PasswordVault,
    session: &SessionGate,
    passphrase: &str,
    path: impl AsRef<Path>,
) -> VaultResult<()> {
    let document = export_backup(vault, session, passphrase).await?;
    tokio::fs::write(path, document).await?;
    Ok(())
}

/// [`import_backup`] from a file.
pub async fn import_backup_from_path(
    vault: &PasswordVault,
    session: &SessionGate,
    path: impl AsRef<Path>,
    passphrase: &str,
) -> VaultResult<ImportStats> {
    let document = tokio::fs::read_to_string(path).await?;
    import_backup(vault, session, &document, passphrase).await
}
