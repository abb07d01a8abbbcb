// File Manager
// High-level file operations that keep folder placeholders consistent
//
// Folder rules:
// - creating a folder writes a zero-byte `{folder}/new.fiacloud`
// - writing an object or folder removes the placeholder of every enclosing folder
// - a delete or rename that empties a folder writes the placeholder back

use super::error::{StorageError, StorageResult};
use super::{ProgressFn, SharedStorage};
use crate::models::OSSFile;
use crate::utils::object_key;

/// Extensions that open in the text editor
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "js", "ts", "jsx", "tsx", "css", "html", "htm", "xml", "yaml", "yml",
    "toml", "ini", "csv", "log", "sh", "py", "rs", "go", "java", "c", "h", "cpp", "sql",
];

/// Whether a file's content should be loaded for editing
pub fn is_text_file(name: &str) -> bool {
    object_key::extension(name)
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Storage front end used by the CLI and the AI editor
#[derive(Clone)]
pub struct FileManager {
    storage: SharedStorage,
}

impl FileManager {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    /// Full bucket listing, newest first
    pub async fn list_files(&self) -> StorageResult<Vec<OSSFile>> {
        self.storage.list(None).await
    }

    /// Upload `data` as `name` inside `folder`; returns the object key
    pub async fn upload_file(
        &self,
        name: &str,
        data: Vec<u8>,
        folder: Option<&str>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> StorageResult<String> {
        let key = object_key::join(folder, validate_name(name)?);
        self.storage.upload(data, &key, on_progress).await?;
        self.remove_placeholders(&key).await;
        Ok(key)
    }

    pub async fn get_file_url(&self, key: &str) -> StorageResult<String> {
        self.storage.get_url(key).await
    }

    pub async fn get_file_content(&self, key: &str) -> StorageResult<String> {
        self.storage.get_content(key).await
    }

    /// Overwrite (or create) a text object
    pub async fn save_file_content(&self, key: &str, content: &str) -> StorageResult<()> {
        self.storage.put_content(key, content.as_bytes()).await?;
        self.remove_placeholders(key).await;
        log::info!("[storage] Saved {} ({} bytes)", key, content.len());
        Ok(())
    }

    pub async fn delete_file(&self, key: &str) -> StorageResult<()> {
        self.storage.delete(key).await?;
        self.ensure_placeholder(object_key::parent_folder(key)).await
    }

    /// Delete every object under `folder`; returns how many were removed
    pub async fn delete_folder(&self, folder: &str) -> StorageResult<usize> {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            return Err(StorageError::InvalidPath(
                "Refusing to delete the bucket root".to_string(),
            ));
        }

        let prefix = object_key::folder_prefix(folder);
        let keys: Vec<String> = self
            .storage
            .list(Some(&prefix))
            .await?
            .into_iter()
            .map(|f| f.name)
            .collect();
        self.storage.delete_multi(&keys).await?;
        log::info!("[storage] Deleted folder {} ({} objects)", folder, keys.len());

        self.ensure_placeholder(object_key::parent_folder(folder))
            .await?;
        Ok(keys.len())
    }

    /// Rename via copy + delete
    pub async fn rename_file(&self, old_key: &str, new_key: &str) -> StorageResult<()> {
        let new_key = new_key.trim_start_matches('/');
        if new_key.is_empty() || new_key.ends_with('/') {
            return Err(StorageError::InvalidPath(new_key.to_string()));
        }
        if old_key == new_key {
            return Ok(());
        }

        self.storage.copy(old_key, new_key).await?;
        self.storage.delete(old_key).await?;
        self.ensure_placeholder(object_key::parent_folder(old_key))
            .await?;
        self.remove_placeholders(new_key).await;
        log::info!("[storage] Renamed {} -> {}", old_key, new_key);
        Ok(())
    }

    /// Create an empty folder; returns the folder path
    pub async fn create_folder(&self, name: &str, parent: Option<&str>) -> StorageResult<String> {
        let clean = name.trim_matches('/');
        if clean.is_empty() {
            return Err(StorageError::InvalidPath(
                "Folder name cannot be empty".to_string(),
            ));
        }

        let folder = object_key::join(parent, clean);
        self.storage
            .put_content(&object_key::placeholder_key(&folder), b"")
            .await?;
        self.remove_placeholders(&folder).await;
        log::info!("[storage] Created folder {}", folder);
        Ok(folder)
    }

    /// Create a text file; returns the object key
    pub async fn create_text_file(
        &self,
        name: &str,
        parent: Option<&str>,
        content: &str,
    ) -> StorageResult<String> {
        let key = object_key::join(parent, validate_name(name)?);
        self.save_file_content(&key, content).await?;
        Ok(key)
    }

    /// Drop the placeholder of every folder above `key`
    ///
    /// Best effort: the write that triggered this already succeeded. A
    /// missing placeholder is fine, anything else is worth a warning.
    async fn remove_placeholders(&self, key: &str) {
        for folder in object_key::ancestors(key) {
            let placeholder = object_key::placeholder_key(folder);
            match self.storage.delete(&placeholder).await {
                Ok(()) | Err(StorageError::NotFound { .. }) => {}
                Err(e) => {
                    log::warn!("[storage] Placeholder {} not removed: {}", placeholder, e);
                }
            }
        }
    }

    /// Write the placeholder back when `folder` has no objects left
    async fn ensure_placeholder(&self, folder: Option<&str>) -> StorageResult<()> {
        let Some(folder) = folder else {
            return Ok(());
        };
        let remaining = self
            .storage
            .list(Some(&object_key::folder_prefix(folder)))
            .await?;
        if remaining.is_empty() {
            self.storage
                .put_content(&object_key::placeholder_key(folder), b"")
                .await?;
            log::info!("[storage] Folder {} is empty, placeholder restored", folder);
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> StorageResult<&str> {
    let name = name.trim_matches('/');
    if name.is_empty() {
        return Err(StorageError::InvalidPath(
            "File name cannot be empty".to_string(),
        ));
    }
    Ok(name)
}
