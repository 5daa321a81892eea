//! App-lock passphrase hashing.
//!
//! The app-lock passphrase is never stored. Settings keep an Argon2id hash and
//! its salt; verification recomputes the hash and compares in constant time.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

const HASH_LEN: usize = 32;
const SALT_LEN: usize = 16;

/// Convert bytes to uppercase hex string.
fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<String>()
}

/// Convert hex string to bytes.
fn hex_to_bytes(hex: &str) -> VaultResult<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return Err(VaultError::MalformedInput(format!(
            "odd length hex string: {}",
            hex.len()
        )));
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| VaultError::MalformedInput(format!("invalid hex at position {}", i)))
        })
        .collect()
}

/// Hash a passphrase with Argon2id.
///
/// Parameters:
/// - Iterations: 2
/// - Memory: 19456 KiB
/// - Parallelism: 1
/// - Output length: 32 bytes
fn argon2_hash(passphrase: &str, salt: &[u8]) -> VaultResult<Zeroizing<[u8; HASH_LEN]>> {
    let params = Params::new(
        19456,          // m_cost (memory in KiB)
        2,              // t_cost (iterations)
        1,              // p_cost (parallelism)
        Some(HASH_LEN), // output length
    )
    .map_err(|e| VaultError::Key(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; HASH_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output[..])
        .map_err(|e| VaultError::Key(format!("Argon2 hash failed: {}", e)))?;

    Ok(output)
}

/// Stored form of the app-lock passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLockSecret {
    /// Salt as uppercase hex
    pub salt: String,
    /// Argon2id output as uppercase hex
    pub hash: String,
}

impl AppLockSecret {
    /// Hash a new passphrase under a fresh random salt.
    pub fn new(passphrase: &str) -> VaultResult<Self> {
        if passphrase.is_empty() {
            return Err(VaultError::InvalidInput(
                "app-lock passphrase cannot be empty".to_string(),
            ));
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = argon2_hash(passphrase, &salt)?;

        Ok(Self {
            salt: bytes_to_hex(&salt),
            hash: bytes_to_hex(&hash[..]),
        })
    }

    /// Check `candidate` against the stored hash.
    ///
    /// Only a boolean comes out; malformed stored data also yields `false`.
    pub fn verify(&self, candidate: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (hex_to_bytes(&self.salt), hex_to_bytes(&self.hash)) else {
            return false;
        };
        let Ok(actual) = argon2_hash(candidate, &salt) else {
            return false;
        };
        actual[..].ct_eq(&expected).into()
    }
}
