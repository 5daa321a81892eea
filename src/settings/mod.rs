//! User preferences.
//!
//! [`Settings`] is a plain serde value. A [`SettingsStore`] only has to load
//! and persist it; the provided setters enforce the cross-field rules:
//! - disabling app-lock also disables biometric unlock
//! - biometric unlock can only be enabled while app-lock is on

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::auth_gate::{AppLockSecret, SessionGate};
use crate::error::{VaultError, VaultResult};
use crate::vault::SortOrder;

/// All persisted preferences. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub dark_mode: bool,
    pub app_lock_enabled: bool,
    pub biometrics_enabled: bool,
    /// Hash of the app-lock passphrase, never the passphrase itself.
    pub app_lock_secret: Option<AppLockSecret>,
    pub sort_order: SortOrder,
    pub prevent_screenshots: bool,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> VaultResult<Settings>;

    async fn save(&self, settings: &Settings) -> VaultResult<()>;

    async fn is_dark_mode(&self) -> VaultResult<bool> {
        Ok(self.load().await?.dark_mode)
    }

    async fn set_dark_mode(&self, enabled: bool) -> VaultResult<()> {
        let mut settings = self.load().await?;
        settings.dark_mode = enabled;
        self.save(&settings).await
    }

    async fn is_app_lock_enabled(&self) -> VaultResult<bool> {
        Ok(self.load().await?.app_lock_enabled)
    }

    /// Disabling also revokes biometric unlock.
    async fn set_app_lock_enabled(&self, enabled: bool) -> VaultResult<()> {
        let mut settings = self.load().await?;
        settings.app_lock_enabled = enabled;
        if !enabled && settings.biometrics_enabled {
            settings.biometrics_enabled = false;
            info!("app lock disabled, biometric unlock revoked");
        }
        self.save(&settings).await
    }

    async fn is_biometrics_enabled(&self) -> VaultResult<bool> {
        Ok(self.load().await?.biometrics_enabled)
    }

    async fn set_biometrics_enabled(&self, enabled: bool) -> VaultResult<()> {
        let mut settings = self.load().await?;
        if enabled && !settings.app_lock_enabled {
            return Err(VaultError::InvalidInput(
                "biometric unlock requires app lock".to_string(),
            ));
        }
        settings.biometrics_enabled = enabled;
        self.save(&settings).await
    }

    async fn app_lock_secret(&self) -> VaultResult<Option<AppLockSecret>> {
        Ok(self.load().await?.app_lock_secret)
    }

    /// Hash and store a new app-lock passphrase.
    async fn set_app_lock_passphrase(&self, passphrase: &str) -> VaultResult<()> {
        let secret = AppLockSecret::new(passphrase)?;
        let mut settings = self.load().await?;
        settings.app_lock_secret = Some(secret);
        self.save(&settings).await
    }

    async fn sort_order(&self) -> VaultResult<SortOrder> {
        Ok(self.load().await?.sort_order)
    }

    async fn set_sort_order(&self, order: SortOrder) -> VaultResult<()> {
        let mut settings = self.load().await?;
        settings.sort_order = order;
        self.save(&settings).await
    }

    async fn is_prevent_screenshots(&self) -> VaultResult<bool> {
        Ok(self.load().await?.prevent_screenshots)
    }

    async fn set_prevent_screenshots(&self, enabled: bool) -> VaultResult<()> {
        let mut settings = self.load().await?;
        settings.prevent_screenshots = enabled;
        self.save(&settings).await
    }
}

/// Settings held in process memory.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> VaultResult<Settings> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> VaultResult<()> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }
}

/// Toggle app-lock in settings and apply it to the live session.
pub async fn set_app_lock(store: &dyn SettingsStore, session: &mut SessionGate, enabled: bool) -> VaultResult<()> {
    store.set_app_lock_enabled(enabled).await?;
    session.set_app_lock_enabled(enabled);
    Ok(())
}

/// Session gate for a fresh app start.
pub async fn session_for(store: &dyn SettingsStore) -> VaultResult<SessionGate> {
    Ok(SessionGate::new(store.is_app_lock_enabled().await?))
}
