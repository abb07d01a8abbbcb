// Key/Value Store
// Persistence port for configs, conversations and UI preferences
//
// Every persisted collection is read-modify-written as a whole value under a
// single key. Writers broadcast the changed key so that other holders of the
// same store can reload (last writer wins, no merge).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::broadcast;

/// File name of the JSON store inside the data directory
pub const STORE_FILENAME: &str = "fiacloud.json";

/// Application identifier used for the data directory name
pub const APP_IDENTIFIER: &str = "com.fiacloud.FiaCloud";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "FIACLOUD_DATA_DIR";

// Persisted keys
pub const KEY_OSS_CONFIG: &str = "fiacloud_oss_config";
pub const KEY_R2_CONFIG: &str = "fiacloud_r2_config";
pub const KEY_STORAGE_PROVIDER: &str = "fiacloud_storage_provider";
pub const KEY_AI_CONFIG: &str = "fiacloud_ai_config";
pub const KEY_ACCESS_PASSWORD: &str = "fiacloud_access_password";
pub const KEY_THEME: &str = "fiacloud_theme";
pub const KEY_CONVERSATIONS: &str = "fiacloud_ai_conversations";
pub const KEY_LAYOUT: &str = "fiacloud_layout";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Store error
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data is corrupted: {0}")]
    Corrupted(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Could not determine application data directory")]
    NoDataDir,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Notification emitted after a key changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A single key was written or removed
    Key(String),
    /// The whole store was cleared
    Cleared,
}

/// Persistence port
///
/// Implementations must be cheap to share behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;

    fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Remove every key
    fn clear(&self) -> StoreResult<()>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Resolve the application data directory
pub fn get_app_data_dir() -> StoreResult<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or(StoreError::NoDataDir)
}

// ============================================================================
// JSON file store
// ============================================================================

/// Store backed by a single JSON object file
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = load_file(&path)?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            path,
            data: RwLock::new(data),
            changes,
        })
    }

    /// Open the store in the default application data directory
    pub fn open_default() -> StoreResult<Self> {
        Self::open(get_app_data_dir()?.join(STORE_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file from disk, discarding the in-memory copy
    pub fn reload(&self) -> StoreResult<()> {
        let fresh = load_file(&self.path)?;
        let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
        *data = fresh;
        Ok(())
    }

    fn persist(&self, data: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        // Write to a sibling temp file first so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}

fn load_file(path: &Path) -> StoreResult<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupted(e.to_string()))
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        {
            let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
            data.insert(key.to_string(), value.to_string());
            self.persist(&data)?;
        }
        log::debug!("[store] wrote key {}", key);
        self.notify(StoreChange::Key(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        {
            let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
            if data.remove(key).is_none() {
                return Ok(());
            }
            self.persist(&data)?;
        }
        self.notify(StoreChange::Key(key.to_string()));
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        {
            let mut data = self.data.write().map_err(|_| StoreError::LockPoisoned)?;
            data.clear();
            self.persist(&data)?;
        }
        log::info!("[store] cleared all data at {}", self.path.display());
        self.notify(StoreChange::Cleared);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory store, used by tests and throwaway sessions
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            data: RwLock::new(HashMap::new()),
            changes,
        }
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let data = self.data.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), value.to_string());
        let _ = self.changes.send(StoreChange::Key(key.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.data
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key);
        let _ = self.changes.send(StoreChange::Key(key.to_string()));
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.data
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        let _ = self.changes.send(StoreChange::Cleared);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
