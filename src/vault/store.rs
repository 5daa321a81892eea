//! Persistence seam for credential entries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{sort_entries, CredentialEntry, SortOrder};
use crate::error::{VaultError, VaultResult};

/// Storage for credential entries. Secrets are only ever stored encrypted.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// All entries in the requested order.
    async fn list(&self, order: SortOrder) -> VaultResult<Vec<CredentialEntry>>;

    async fn get(&self, id: i64) -> VaultResult<Option<CredentialEntry>>;

    /// Store a new entry and return its id. The incoming `id` is ignored.
    async fn insert(&self, entry: CredentialEntry) -> VaultResult<i64>;

    /// Replace an existing entry. Fails with `NotFound` for unknown ids.
    async fn update(&self, entry: CredentialEntry) -> VaultResult<()>;

    /// Remove an entry. Unknown ids are not an error.
    async fn delete(&self, id: i64) -> VaultResult<()>;

    async fn set_pinned(&self, id: i64, pinned: bool) -> VaultResult<()>;

    /// Case-insensitive lookup by service name.
    async fn find_by_service_name(&self, service_name: &str) -> VaultResult<Option<CredentialEntry>> {
        let wanted = service_name.to_lowercase();
        Ok(self
            .list(SortOrder::Name)
            .await?
            .into_iter()
            .find(|entry| entry.service_name.to_lowercase() == wanted))
    }
}

#[derive(Debug, Default)]
struct Inner {
    last_id: i64,
    entries: BTreeMap<i64, CredentialEntry>,
}

/// In-process store. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    inner: RwLock<Inner>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VaultStore for MemoryVaultStore {
    async fn list(&self, order: SortOrder) -> VaultResult<Vec<CredentialEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<CredentialEntry> = inner.entries.values().cloned().collect();
        sort_entries(&mut entries, order);
        Ok(entries)
    }

    async fn get(&self, id: i64) -> VaultResult<Option<CredentialEntry>> {
        Ok(self.inner.read().await.entries.get(&id).cloned())
    }

    async fn insert(&self, mut entry: CredentialEntry) -> VaultResult<i64> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        entry.id = inner.last_id;
        let id = entry.id;
        inner.entries.insert(id, entry);
        Ok(id)
    }

    async fn update(&self, entry: CredentialEntry) -> VaultResult<()> {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(VaultError::NotFound(entry.id)),
        }
    }

    async fn delete(&self, id: i64) -> VaultResult<()> {
        self.inner.write().await.entries.remove(&id);
        Ok(())
    }

    async fn set_pinned(&self, id: i64, pinned: bool) -> VaultResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.entries.get_mut(&id).ok_or(VaultError::NotFound(id))?;
        entry.is_pinned = pinned;
        Ok(())
    }
}
