// Shared handles for one CLI invocation

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fiacloud_lib::repositories::{ConfigRepository, ConversationRepository};
use fiacloud_lib::services::ai::ChatService;
use fiacloud_lib::services::auth::{AuthError, AuthService};
use fiacloud_lib::services::crypto::ConfigCipher;
use fiacloud_lib::services::storage::{load_active_storage, FileManager};
use fiacloud_lib::utils::store::{JsonFileStore, SharedStore, STORE_FILENAME};

pub struct AppContext {
    pub store: SharedStore,
    pub config: ConfigRepository,
}

impl AppContext {
    /// Open the JSON store in `data_dir`, or in the default data directory
    pub fn open(data_dir: Option<&Path>) -> Result<Self> {
        let store = match data_dir {
            Some(dir) => JsonFileStore::open(dir.join(STORE_FILENAME)),
            None => JsonFileStore::open_default(),
        }
        .context("Failed to open the settings store")?;
        log::debug!("[cli] Using store {}", store.path().display());

        let store: SharedStore = Arc::new(store);
        let config = ConfigRepository::new(store.clone(), ConfigCipher::from_machine());
        Ok(Self { store, config })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.config.clone())
    }

    /// Gate every data command behind the access password
    pub fn unlock(&self, password: Option<&str>) -> Result<()> {
        match self.auth().verify(password.unwrap_or("")) {
            Ok(()) => Ok(()),
            Err(AuthError::WrongPassword) if password.is_none() => {
                bail!("An access password is set; pass --password or FIACLOUD_PASSWORD")
            }
            Err(e) => bail!(e.to_user_message()),
        }
    }

    pub fn files(&self) -> Result<FileManager> {
        let storage = load_active_storage(&self.config)
            .map_err(|e| anyhow::anyhow!(e.to_user_message()))?;
        Ok(FileManager::new(storage))
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(
            self.config.clone(),
            ConversationRepository::new(self.store.clone()),
        )
    }
}
