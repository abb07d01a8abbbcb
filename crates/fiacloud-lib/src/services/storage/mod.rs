// Storage Service Module
// Object storage providers behind one interface, plus folder emulation
//
// Vendor REST calls stay behind `StorageService`; everything above it
// (file manager, tree building, CLI) only sees flat object keys.

pub mod aliyun;
pub mod error;
pub mod listing;
pub mod manager;
pub mod memory;
pub mod r2;
pub mod signing;
pub mod tree;

use std::sync::Arc;

use async_trait::async_trait;

pub use aliyun::AliyunStorage;
pub use error::{StorageError, StorageErrorCode, StorageResult};
pub use manager::FileManager;
pub use memory::MemoryStorage;
pub use r2::R2Storage;
pub use tree::{build_tree, TreeNode};

use crate::models::{OSSFile, OssConfigData, R2ConfigData, StorageProvider};
use crate::repositories::ConfigRepository;
use crate::utils::object_key;

/// Lifetime of presigned download URLs
pub const URL_EXPIRES_SECS: u64 = 3600;

/// Page size for listings
pub const LIST_PAGE_SIZE: u32 = 1000;

/// Upper bound on listing pages fetched in one `list` call
pub const MAX_LIST_PAGES: usize = 100;

/// Upload progress callback, receives a percentage in `0..=100`
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Contract every object storage provider implements
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Which provider this is
    fn provider(&self) -> StorageProvider;

    /// List objects under `prefix`, newest first
    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<OSSFile>>;

    /// Upload raw bytes to `path`
    async fn upload(
        &self,
        data: Vec<u8>,
        path: &str,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> StorageResult<()>;

    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Delete many objects; an empty slice is a no-op
    async fn delete_multi(&self, paths: &[String]) -> StorageResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        futures::future::try_join_all(paths.iter().map(|p| self.delete(p))).await?;
        Ok(())
    }

    /// Time-limited or permanent download URL
    async fn get_url(&self, path: &str) -> StorageResult<String>;

    /// Raw object bytes
    async fn get_bytes(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Object content as text (lossy UTF-8)
    async fn get_content(&self, path: &str) -> StorageResult<String> {
        let bytes = self.get_bytes(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()>;

    /// Server-side copy within the bucket
    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()>;
}

/// Shared storage handle
pub type SharedStorage = Arc<dyn StorageService>;

/// Credentials for one provider
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Aliyun(OssConfigData),
    R2(R2ConfigData),
}

impl StorageConfig {
    pub fn provider(&self) -> StorageProvider {
        match self {
            StorageConfig::Aliyun(_) => StorageProvider::Aliyun,
            StorageConfig::R2(_) => StorageProvider::R2,
        }
    }
}

/// Factory: build a provider from its credentials
pub fn create_storage(config: StorageConfig) -> StorageResult<SharedStorage> {
    match config {
        StorageConfig::Aliyun(config) => {
            require("accessKeyId", &config.access_key_id)?;
            require("accessKeySecret", &config.access_key_secret)?;
            require("bucket", &config.bucket)?;
            require("region", &config.region)?;
            Ok(Arc::new(AliyunStorage::new(config)))
        }
        StorageConfig::R2(config) => {
            require("accountId", &config.account_id)?;
            require("accessKeyId", &config.access_key_id)?;
            require("accessKeySecret", &config.access_key_secret)?;
            require("bucket", &config.bucket)?;
            Ok(Arc::new(R2Storage::new(config)))
        }
    }
}

/// Build the provider selected by the persisted active-provider flag
pub fn load_active_storage(repo: &ConfigRepository) -> StorageResult<SharedStorage> {
    let provider = repo.active_provider();
    let config = match provider {
        StorageProvider::Aliyun => repo.load_oss_config().map(StorageConfig::Aliyun),
        StorageProvider::R2 => repo.load_r2_config().map(StorageConfig::R2),
    };
    match config {
        Some(config) => {
            log::info!("[storage] Using {} provider", provider);
            create_storage(config)
        }
        None => Err(StorageError::NotConfigured),
    }
}

fn require(field: &str, value: &str) -> StorageResult<()> {
    if value.trim().is_empty() {
        return Err(StorageError::InvalidConfig {
            message: format!("{} is required", field),
        });
    }
    Ok(())
}

/// MIME type guessed from the key's extension
pub fn guess_content_type(key: &str) -> &'static str {
    match object_key::extension(key).as_deref() {
        Some("txt") | Some("log") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("json") => "application/json",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("ts") => "text/plain; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}
