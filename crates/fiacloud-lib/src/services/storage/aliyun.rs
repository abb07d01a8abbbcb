// Aliyun OSS adapter
// Virtual-hosted REST API signed with the OSS v1 header signature

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};

use super::error::{StorageError, StorageResult};
use super::listing::{error_from_status, ListBucketResult};
use super::signing::{http_date, oss_authorization, oss_signature, oss_string_to_sign};
use super::{guess_content_type, ProgressFn, StorageService, LIST_PAGE_SIZE, MAX_LIST_PAGES,
    URL_EXPIRES_SECS};
use crate::models::{sort_newest_first, OSSFile, OssConfigData, StorageProvider};
use crate::utils::object_key::encode_key;

const PROVIDER: &str = "Aliyun OSS";

pub struct AliyunStorage {
    config: OssConfigData,
    client: Client,
    /// `https://{bucket}.{endpoint}`
    base_url: String,
}

impl AliyunStorage {
    pub fn new(config: OssConfigData) -> Self {
        let base_url = format!("https://{}.{}", config.bucket, config.endpoint_host());
        Self {
            config,
            client: Client::new(),
            base_url,
        }
    }

    /// Point the adapter at a different host (OSS-compatible gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &OssConfigData {
        &self.config
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, encode_key(key))
    }

    /// Canonicalized resource; keys are signed unencoded
    fn resource(&self, key: &str) -> String {
        format!("/{}/{}", self.config.bucket, key)
    }

    /// Attach `Date`, `Content-Type`, `x-oss-*` and `Authorization` headers
    fn signed(
        &self,
        method: Method,
        url: &str,
        resource: &str,
        content_type: &str,
        oss_headers: BTreeMap<String, String>,
    ) -> StorageResult<RequestBuilder> {
        let date = http_date(Utc::now());
        let to_sign = oss_string_to_sign(
            method.as_str(),
            "",
            content_type,
            &date,
            &oss_headers,
            resource,
        );
        let authorization = oss_authorization(
            &self.config.access_key_id,
            &self.config.access_key_secret,
            &to_sign,
        )?;

        let mut request = self
            .client
            .request(method, url)
            .header("Date", date)
            .header("Authorization", authorization);
        if !content_type.is_empty() {
            request = request.header("Content-Type", content_type);
        }
        for (name, value) in oss_headers {
            request = request.header(name, value);
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder, key: &str) -> StorageResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::warn!("[storage] {} {} failed with {}", PROVIDER, key, status);
        Err(error_from_status(PROVIDER, status.as_u16(), key, &body))
    }

    async fn put_object(&self, path: &str, data: Vec<u8>) -> StorageResult<()> {
        let content_type = guess_content_type(path);
        let request = self
            .signed(
                Method::PUT,
                &self.object_url(path),
                &self.resource(path),
                content_type,
                BTreeMap::new(),
            )?
            .body(data);
        self.send(request, path).await?;
        Ok(())
    }

    /// Presigned GET URL (query-string signature)
    pub fn presign_url(&self, path: &str, expires_at: i64) -> StorageResult<String> {
        let to_sign = format!("GET\n\n\n{}\n{}", expires_at, self.resource(path));
        let signature = oss_signature(&self.config.access_key_secret, &to_sign)?;
        Ok(format!(
            "{}?OSSAccessKeyId={}&Expires={}&Signature={}",
            self.object_url(path),
            urlencoding::encode(&self.config.access_key_id),
            expires_at,
            urlencoding::encode(&signature)
        ))
    }
}

#[async_trait]
impl StorageService for AliyunStorage {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Aliyun
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<OSSFile>> {
        let mut files = Vec::new();
        let mut marker: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![("max-keys", LIST_PAGE_SIZE.to_string())];
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                query.push(("prefix", prefix.to_string()));
            }
            if let Some(marker) = &marker {
                query.push(("marker", marker.clone()));
            }

            let url = format!("{}/", self.base_url);
            let resource = format!("/{}/", self.config.bucket);
            let request = self
                .signed(Method::GET, &url, &resource, "", BTreeMap::new())?
                .query(&query);
            let body = self.send(request, prefix.unwrap_or("")).await?.text().await?;

            let page = ListBucketResult::parse(&body)?;
            let next = page.continuation().map(str::to_string);
            files.extend(page.into_files(|key| self.object_url(key)));

            match next {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        sort_newest_first(&mut files);
        log::info!("[storage] Listed {} objects from {}", files.len(), PROVIDER);
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
        let size = data.len();
        self.put_object(path, data).await?;
        if let Some(report) = on_progress {
            report(100);
        }
        log::info!("[storage] Uploaded {} ({} bytes) to {}", path, size, PROVIDER);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let request = self.signed(
            Method::DELETE,
            &self.object_url(path),
            &self.resource(path),
            "",
            BTreeMap::new(),
        )?;
        self.send(request, path).await?;
        log::info!("[storage] Deleted {} from {}", path, PROVIDER);
        Ok(())
    }

    async fn get_url(&self, path: &str) -> StorageResult<String> {
        let expires_at = Utc::now().timestamp() + URL_EXPIRES_SECS as i64;
        self.presign_url(path, expires_at)
    }

    async fn get_bytes(&self, path: &str) -> StorageResult<Vec<u8>> {
        let request = self.signed(
            Method::GET,
            &self.object_url(path),
            &self.resource(path),
            "",
            BTreeMap::new(),
        )?;
        let bytes = self.send(request, path).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        self.put_object(path, content.to_vec()).await
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()> {
        let mut oss_headers = BTreeMap::new();
        oss_headers.insert(
            "x-oss-copy-source".to_string(),
            format!("/{}/{}", self.config.bucket, encode_key(source)),
        );
        let request = self.signed(
            Method::PUT,
            &self.object_url(destination),
            &self.resource(destination),
            "",
            oss_headers,
        )?;
        self.send(request, destination).await?;
        log::info!("[storage] Copied {} -> {} on {}", source, destination, PROVIDER);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> AliyunStorage {
        AliyunStorage::new(OssConfigData::new(
            "AKID".to_string(),
            "secret".to_string(),
            "my-bucket".to_string(),
            "oss-cn-shanghai".to_string(),
        ))
    }

    #[test]
    fn test_object_url_is_virtual_hosted() {
        let storage = storage();
        assert_eq!(
            storage.object_url("my docs/a.txt"),
            "https://my-bucket.oss-cn-shanghai.aliyuncs.com/my%20docs/a.txt"
        );
        assert_eq!(storage.resource("my docs/a.txt"), "/my-bucket/my docs/a.txt");
    }

    #[test]
    fn test_presign_url_shape() {
        let url = storage().presign_url("docs/a.txt", 1_700_000_000).unwrap();
        assert!(url.starts_with(
            "https://my-bucket.oss-cn-shanghai.aliyuncs.com/docs/a.txt?OSSAccessKeyId=AKID&Expires=1700000000&Signature="
        ));
        // Signature is url-encoded base64
        assert!(!url.contains('+'));
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let storage = storage().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(storage.object_url("a.txt"), "http://127.0.0.1:9000/a.txt");
    }
}
