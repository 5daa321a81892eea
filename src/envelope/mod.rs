//! Envelope encryption for at-rest secrets and password-protected backups.
//!
//! - **Cipher**: AES-256-GCM, 96-bit random nonce per call, 128-bit tag
//! - **At rest**: `nonce || ciphertext || tag`, base64 encoded, keyed by the
//!   per-installation key from a [`KeyStore`]
//! - **Backups**: PBKDF2-HMAC-SHA256 (65 536 iterations, 16-byte salt) derives
//!   the key from a passphrase; the result is an [`EncryptedEnvelope`] with
//!   salt, nonce and ciphertext encoded separately
//!
//! A tag mismatch always surfaces as [`VaultError::AuthFailure`] so callers can
//! say "wrong password or corrupted file" instead of a generic error.

mod keystore;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{VaultError, VaultResult};

pub use keystore::{KeyStore, MemoryKeyStore};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes (128 bits).
pub const TAG_LEN: usize = 16;

/// PBKDF2 salt length in bytes.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count for backup passphrases.
pub const PBKDF2_ITERATIONS: u32 = 65_536;

/// Decrypted secret text. Wiped from memory on drop.
pub type SecretString = Zeroizing<String>;

/// Generate a fresh random 256-bit key.
pub fn generate_key() -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rand::thread_rng().fill_bytes(&mut key[..]);
    key
}

fn cipher_for(key: &[u8]) -> VaultResult<Aes256Gcm> {
    if key.len() != KEY_LEN {
        return Err(VaultError::Key(format!(
            "key must be {} bytes, got {}",
            KEY_LEN,
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| VaultError::Key(e.to_string()))
}

/// Encrypt with a fresh nonce. Returns `(nonce, ciphertext || tag)`.
fn seal(plaintext: &[u8], key: &[u8]) -> VaultResult<([u8; NONCE_LEN], Vec<u8>)> {
    let cipher = cipher_for(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| VaultError::Encryption(e.to_string()))?;

    Ok((nonce_bytes, ciphertext))
}

/// Decrypt and verify. Any tag failure is reported as [`VaultError::AuthFailure`].
fn open(nonce: &[u8], ciphertext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    if nonce.len() != NONCE_LEN {
        return Err(VaultError::MalformedInput(format!(
            "nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }
    if ciphertext.len() < TAG_LEN {
        return Err(VaultError::MalformedInput("ciphertext too short".to_string()));
    }

    let cipher = cipher_for(key)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::AuthFailure)
}

/// Encrypt `plaintext` under `key`, returning `nonce || ciphertext || tag`.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    let (nonce, ciphertext) = seal(plaintext, key)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a blob produced by [`encrypt`].
pub fn decrypt(sealed: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::MalformedInput(
            "sealed data shorter than nonce and tag".to_string(),
        ));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    open(nonce, ciphertext, key)
}

/// Derive a 256-bit key from a passphrase with PBKDF2-HMAC-SHA256.
///
/// Deliberately slow; async callers should run it on the blocking pool.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key[..]);
    key
}

// ═══════════════════════════════════════════════════════════════════════════════
// Passphrase envelopes
// ═══════════════════════════════════════════════════════════════════════════════

/// Password-protected payload, each part base64 encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    /// AES-GCM nonce
    pub iv: String,
    /// PBKDF2 salt
    pub salt: String,
    /// Ciphertext with the authentication tag appended
    pub ciphertext: String,
}

/// Encrypt `plaintext` under a key derived from `passphrase` and a fresh salt.
pub fn seal_with_passphrase(plaintext: &[u8], passphrase: &str) -> VaultResult<EncryptedEnvelope> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = derive_key(passphrase, &salt);
    let (nonce, ciphertext) = seal(plaintext, &key[..])?;

    Ok(EncryptedEnvelope {
        iv: STANDARD.encode(nonce),
        salt: STANDARD.encode(salt),
        ciphertext: STANDARD.encode(ciphertext),
    })
}

/// Decrypt an envelope. A wrong passphrase yields [`VaultError::AuthFailure`].
pub fn open_with_passphrase(
    envelope: &EncryptedEnvelope,
    passphrase: &str,
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let salt = STANDARD.decode(&envelope.salt)?;
    let nonce = STANDARD.decode(&envelope.iv)?;
    let ciphertext = STANDARD.decode(&envelope.ciphertext)?;

    let key = derive_key(passphrase, &salt);
    open(&nonce, &ciphertext, &key[..]).map(Zeroizing::new)
}

// ═══════════════════════════════════════════════════════════════════════════════
// At-rest cipher
// ═══════════════════════════════════════════════════════════════════════════════

/// Encrypts and decrypts single stored secrets.
///
/// The vault only ever talks to this trait, which keeps key management out of
/// the core and lets tests observe every decryption.
pub trait SecretCipher: Send + Sync {
    /// Encrypt a secret into an opaque text blob suitable for storage.
    fn encrypt_secret(&self, plaintext: &str) -> VaultResult<String>;

    /// Decrypt a blob produced by [`SecretCipher::encrypt_secret`].
    fn decrypt_secret(&self, blob: &str) -> VaultResult<SecretString>;
}

/// AES-256-GCM under the installation key held by a [`KeyStore`].
pub struct InstallationCipher {
    keys: Arc<dyn KeyStore>,
}

impl InstallationCipher {
    pub fn new(keys: Arc<dyn KeyStore>) -> Self {
        Self { keys }
    }
}

impl SecretCipher for InstallationCipher {
    fn encrypt_secret(&self, plaintext: &str) -> VaultResult<String> {
        let key = self.keys.installation_key()?;
        let sealed = encrypt(plaintext.as_bytes(), &key[..])?;
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt_secret(&self, blob: &str) -> VaultResult<SecretString> {
        let sealed = STANDARD.decode(blob)?;
        let key = self.keys.installation_key()?;
        let plaintext = decrypt(&sealed, &key[..])?;

        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            VaultError::MalformedInput("decrypted secret is not valid UTF-8".to_string())
        })
    }
}
