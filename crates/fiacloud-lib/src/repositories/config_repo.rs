// Config Repository
// Encrypted provider/AI credentials and plaintext UI preferences

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AIConfigData, OssConfigData, R2ConfigData, StorageProvider};
use crate::services::crypto::{ConfigCipher, CryptoError};
use crate::utils::store::{
    SharedStore, StoreError, KEY_ACCESS_PASSWORD, KEY_AI_CONFIG, KEY_LAYOUT, KEY_OSS_CONFIG,
    KEY_R2_CONFIG, KEY_STORAGE_PROVIDER, KEY_THEME,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Colour theme preference
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    /// Next theme in the light -> dark -> system cycle
    pub fn cycle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
            Theme::System => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

/// Panel widths remembered between sessions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutWidths {
    pub sidebar: u32,
    pub ai_sidebar: u32,
}

impl Default for LayoutWidths {
    fn default() -> Self {
        Self {
            sidebar: 280,
            ai_sidebar: 360,
        }
    }
}

/// Typed access to persisted configuration
#[derive(Clone)]
pub struct ConfigRepository {
    store: SharedStore,
    cipher: ConfigCipher,
}

impl ConfigRepository {
    pub fn new(store: SharedStore, cipher: ConfigCipher) -> Self {
        Self { store, cipher }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn cipher(&self) -> &ConfigCipher {
        &self.cipher
    }

    // =========================================================================
    // Storage providers
    // =========================================================================

    pub fn load_oss_config(&self) -> Option<OssConfigData> {
        self.load_encrypted(KEY_OSS_CONFIG)
    }

    pub fn save_oss_config(&self, config: &OssConfigData) -> ConfigResult<()> {
        self.save_encrypted(KEY_OSS_CONFIG, config)
    }

    pub fn load_r2_config(&self) -> Option<R2ConfigData> {
        self.load_encrypted(KEY_R2_CONFIG)
    }

    pub fn save_r2_config(&self, config: &R2ConfigData) -> ConfigResult<()> {
        self.save_encrypted(KEY_R2_CONFIG, config)
    }

    /// Remove the stored credentials of one provider
    pub fn clear_storage_config(&self, provider: StorageProvider) -> ConfigResult<()> {
        let key = match provider {
            StorageProvider::Aliyun => KEY_OSS_CONFIG,
            StorageProvider::R2 => KEY_R2_CONFIG,
        };
        self.store.remove(key)?;
        Ok(())
    }

    /// Active provider; defaults to Aliyun when unset or unreadable
    pub fn active_provider(&self) -> StorageProvider {
        match self.store.read(KEY_STORAGE_PROVIDER) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                log::warn!("[config] {}; falling back to aliyun", e);
                StorageProvider::default()
            }),
            Ok(None) => StorageProvider::default(),
            Err(e) => {
                log::warn!("[config] Failed to read active provider: {}", e);
                StorageProvider::default()
            }
        }
    }

    pub fn set_active_provider(&self, provider: StorageProvider) -> ConfigResult<()> {
        self.store
            .write(KEY_STORAGE_PROVIDER, &provider.to_string())?;
        Ok(())
    }

    // =========================================================================
    // AI
    // =========================================================================

    pub fn load_ai_config(&self) -> Option<AIConfigData> {
        self.load_encrypted(KEY_AI_CONFIG)
    }

    pub fn save_ai_config(&self, config: &AIConfigData) -> ConfigResult<()> {
        self.save_encrypted(KEY_AI_CONFIG, config)
    }

    pub fn clear_ai_config(&self) -> ConfigResult<()> {
        self.store.remove(KEY_AI_CONFIG)?;
        Ok(())
    }

    // =========================================================================
    // Access password
    // =========================================================================

    /// Stored access password
    ///
    /// Unlike the other configs a decrypt failure is reported, because a
    /// corrupted password must not silently unlock the app.
    pub fn load_access_password(&self) -> ConfigResult<Option<String>> {
        match self.store.read(KEY_ACCESS_PASSWORD)? {
            Some(sealed) => Ok(Some(self.cipher.open(&sealed)?)),
            None => Ok(None),
        }
    }

    pub fn save_access_password(&self, password: &str) -> ConfigResult<()> {
        let sealed = self.cipher.seal(password)?;
        self.store.write(KEY_ACCESS_PASSWORD, &sealed)?;
        Ok(())
    }

    pub fn clear_access_password(&self) -> ConfigResult<()> {
        self.store.remove(KEY_ACCESS_PASSWORD)?;
        Ok(())
    }

    // =========================================================================
    // UI preferences
    // =========================================================================

    pub fn theme(&self) -> Theme {
        self.store
            .read(KEY_THEME)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_value(serde_json::Value::String(raw)).ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) -> ConfigResult<()> {
        self.store.write(KEY_THEME, theme.as_str())?;
        Ok(())
    }

    pub fn layout(&self) -> LayoutWidths {
        self.store
            .read(KEY_LAYOUT)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn set_layout(&self, layout: &LayoutWidths) -> ConfigResult<()> {
        self.store.write(KEY_LAYOUT, &serde_json::to_string(layout)?)?;
        Ok(())
    }

    /// Wipe every persisted value
    pub fn clear_all(&self) -> ConfigResult<()> {
        self.store.clear()?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Read and decrypt a typed config; any failure means "unconfigured"
    fn load_encrypted<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let sealed = match self.store.read(key) {
            Ok(Some(sealed)) => sealed,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("[config] Failed to read {}: {}", key, e);
                return None;
            }
        };

        let plaintext = match self.cipher.open(&sealed) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                log::warn!("[config] Failed to decrypt {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&plaintext) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("[config] Failed to parse {}: {}", key, e);
                None
            }
        }
    }

    fn save_encrypted<T: Serialize>(&self, key: &str, value: &T) -> ConfigResult<()> {
        let json = serde_json::to_string(value)?;
        let sealed = self.cipher.seal(&json)?;
        self.store.write(key, &sealed)?;
        log::info!("[config] Saved {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::store::MemoryStore;

    fn repo() -> ConfigRepository {
        ConfigRepository::new(MemoryStore::shared(), ConfigCipher::from_secret("test"))
    }

    fn sample_oss() -> OssConfigData {
        OssConfigData::new(
            "LTAI".to_string(),
            "secret".to_string(),
            "bucket".to_string(),
            "oss-cn-hangzhou".to_string(),
        )
    }

    #[test]
    fn test_oss_config_round_trip_is_encrypted() {
        let repo = repo();
        repo.save_oss_config(&sample_oss()).unwrap();

        let raw = repo.store().read(KEY_OSS_CONFIG).unwrap().unwrap();
        assert!(!raw.contains("LTAI"));
        assert_eq!(repo.load_oss_config(), Some(sample_oss()));
    }

    #[test]
    fn test_corrupted_config_reads_as_unconfigured() {
        let repo = repo();
        repo.store().write(KEY_AI_CONFIG, "garbage").unwrap();
        assert_eq!(repo.load_ai_config(), None);
    }

    #[test]
    fn test_config_from_other_key_reads_as_unconfigured() {
        let store = MemoryStore::shared();
        let writer = ConfigRepository::new(store.clone(), ConfigCipher::from_secret("a"));
        writer.save_oss_config(&sample_oss()).unwrap();

        let reader = ConfigRepository::new(store, ConfigCipher::from_secret("b"));
        assert_eq!(reader.load_oss_config(), None);
    }

    #[test]
    fn test_active_provider_defaults_and_persists() {
        let repo = repo();
        assert_eq!(repo.active_provider(), StorageProvider::Aliyun);
        repo.set_active_provider(StorageProvider::R2).unwrap();
        assert_eq!(repo.active_provider(), StorageProvider::R2);

        repo.store().write(KEY_STORAGE_PROVIDER, "ftp").unwrap();
        assert_eq!(repo.active_provider(), StorageProvider::Aliyun);
    }

    #[test]
    fn test_clear_storage_config() {
        let repo = repo();
        repo.save_oss_config(&sample_oss()).unwrap();
        repo.clear_storage_config(StorageProvider::Aliyun).unwrap();
        assert_eq!(repo.load_oss_config(), None);
    }

    #[test]
    fn test_theme_and_layout_are_plaintext() {
        let repo = repo();
        assert_eq!(repo.theme(), Theme::System);
        repo.set_theme(Theme::Dark).unwrap();
        assert_eq!(repo.store().read(KEY_THEME).unwrap().as_deref(), Some("dark"));
        assert_eq!(repo.theme(), Theme::Dark);

        let layout = LayoutWidths {
            sidebar: 300,
            ai_sidebar: 420,
        };
        repo.set_layout(&layout).unwrap();
        assert_eq!(repo.layout(), layout);
    }

    #[test]
    fn test_theme_cycle() {
        assert_eq!(Theme::Light.cycle(), Theme::Dark);
        assert_eq!(Theme::Dark.cycle(), Theme::System);
        assert_eq!(Theme::System.cycle(), Theme::Light);
    }
}
