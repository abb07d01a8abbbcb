// In-process storage
// Implements the provider contract over a map; used offline and in tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};

use super::error::{StorageError, StorageResult};
use super::{ProgressFn, StorageService};
use crate::models::{sort_newest_first, OSSFile, StorageProvider};

struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct Bucket {
    objects: BTreeMap<String, StoredObject>,
    /// Write counter; keeps last-modified strictly increasing
    writes: i64,
}

/// Storage backed by an in-memory map
#[derive(Default)]
pub struct MemoryStorage {
    bucket: Mutex<Bucket>,
    /// Provider this instance reports itself as
    provider: StorageProvider,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: StorageProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Sorted list of every stored key
    pub fn keys(&self) -> Vec<String> {
        match self.bucket.lock() {
            Ok(bucket) => bucket.objects.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bucket
            .lock()
            .map(|bucket| bucket.objects.contains_key(key))
            .unwrap_or(false)
    }

    fn with_bucket<T>(&self, f: impl FnOnce(&mut Bucket) -> StorageResult<T>) -> StorageResult<T> {
        let mut bucket = self
            .bucket
            .lock()
            .map_err(|_| StorageError::ApiError {
                provider: "memory".to_string(),
                code: "LockPoisoned".to_string(),
                message: "storage lock poisoned".to_string(),
            })?;
        f(&mut bucket)
    }

    fn write(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        self.with_bucket(|bucket| {
            bucket.writes += 1;
            let last_modified = Utc::now() + Duration::milliseconds(bucket.writes);
            bucket.objects.insert(
                path.to_string(),
                StoredObject {
                    data,
                    last_modified,
                },
            );
            Ok(())
        })
    }
}

#[async_trait]
impl StorageService for MemoryStorage {
    fn provider(&self) -> StorageProvider {
        self.provider
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<OSSFile>> {
        let prefix = prefix.unwrap_or("");
        let mut files = self.with_bucket(|bucket| {
            Ok(bucket
                .objects
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, obj)| {
                    OSSFile::new(
                        key.clone(),
                        format!("memory://{}", key),
                        obj.last_modified.to_rfc3339_opts(SecondsFormat::Millis, true),
                        obj.data.len() as u64,
                    )
                })
                .collect::<Vec<_>>())
        })?;
        sort_newest_first(&mut files);
        Ok(files)
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        path: &str,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> StorageResult<()> {
        if let Some(report) = on_progress {
            report(0);
        }
        self.write(path, data)?;
        if let Some(report) = on_progress {
            report(100);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        // Deleting a missing object succeeds, as it does on S3 and OSS
        self.with_bucket(|bucket| {
            bucket.objects.remove(path);
            Ok(())
        })
    }

    async fn get_url(&self, path: &str) -> StorageResult<String> {
        if self.contains(path) {
            Ok(format!("memory://{}", path))
        } else {
            Err(StorageError::NotFound {
                key: path.to_string(),
            })
        }
    }

    async fn get_bytes(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.with_bucket(|bucket| {
            bucket
                .objects
                .get(path)
                .map(|obj| obj.data.clone())
                .ok_or_else(|| StorageError::NotFound {
                    key: path.to_string(),
                })
        })
    }

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        self.write(path, content.to_vec())
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()> {
        let data = self.get_bytes(source).await?;
        self.write(destination, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    #[tokio::test]
    async fn test_list_newest_first_with_prefix() {
        let storage = MemoryStorage::new();
        storage.put_content("docs/a.txt", b"a").await.unwrap();
        storage.put_content("docs/b.txt", b"bb").await.unwrap();
        storage.put_content("other.txt", b"c").await.unwrap();

        let files = storage.list(Some("docs/")).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["docs/b.txt", "docs/a.txt"]);
        assert_eq!(files[0].size, 2);
        assert_eq!(files[0].file_type.as_deref(), Some("txt"));
    }

    #[tokio::test]
    async fn test_upload_reports_progress() {
        let storage = MemoryStorage::new();
        let last = AtomicU8::new(255);
        let report: &ProgressFn<'_> = &|p: u8| last.store(p, Ordering::SeqCst);
        storage
            .upload(b"data".to_vec(), "a.bin", Some(report))
            .await
            .unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_copy_and_missing_object() {
        let storage = MemoryStorage::new();
        storage.put_content("a.txt", "héllo".as_bytes()).await.unwrap();
        storage.copy("a.txt", "b.txt").await.unwrap();
        assert_eq!(storage.get_content("b.txt").await.unwrap(), "héllo");

        assert!(matches!(
            storage.get_bytes("missing").await,
            Err(StorageError::NotFound { .. })
        ));
        assert!(storage.copy("missing", "c.txt").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_multi() {
        let storage = MemoryStorage::new();
        storage.put_content("a", b"1").await.unwrap();
        storage.put_content("b", b"2").await.unwrap();
        storage.put_content("c", b"3").await.unwrap();

        storage.delete_multi(&[]).await.unwrap();
        assert_eq!(storage.keys().len(), 3);

        storage
            .delete_multi(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(storage.keys(), vec!["b".to_string()]);
    }
}
