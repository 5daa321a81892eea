//! Installation key holders.

use zeroize::Zeroizing;

use super::{generate_key, KEY_LEN};
use crate::error::{VaultError, VaultResult};

/// Supplies the per-installation symmetric key for at-rest encryption.
///
/// Real hosts back this with a platform keystore; the core never persists
/// the key itself.
pub trait KeyStore: Send + Sync {
    fn installation_key(&self) -> VaultResult<Zeroizing<[u8; KEY_LEN]>>;
}

/// Key held in process memory.
pub struct MemoryKeyStore {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl MemoryKeyStore {
    /// New store with a random key.
    pub fn generate() -> Self {
        Self { key: generate_key() }
    }

    /// Store wrapping caller-provided key material.
    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::Key(format!("key must be {} bytes, got {}", KEY_LEN, bytes.len()))
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
        })
    }
}

impl KeyStore for MemoryKeyStore {
    fn installation_key(&self) -> VaultResult<Zeroizing<[u8; KEY_LEN]>> {
        Ok(Zeroizing::new(*self.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(MemoryKeyStore::from_bytes(&[7u8; KEY_LEN]).is_ok());
        assert!(matches!(
            MemoryKeyStore::from_bytes(&[7u8; 31]),
            Err(VaultError::Key(_))
        ));
    }

    #[test]
    fn test_key_is_stable() {
        let store = MemoryKeyStore::generate();
        assert_eq!(*store.installation_key().unwrap(), *store.installation_key().unwrap());
    }
}
