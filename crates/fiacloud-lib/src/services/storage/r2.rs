// Cloudflare R2 adapter
// Path-style S3 API signed with AWS Signature Version 4

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response};

use super::error::{StorageError, StorageResult};
use super::listing::{error_from_status, ListBucketResult};
use super::signing::{amz_date, canonical_query, sha256_hex, SigV4Signer};
use super::{guess_content_type, ProgressFn, StorageService, LIST_PAGE_SIZE, MAX_LIST_PAGES,
    URL_EXPIRES_SECS};
use crate::models::{sort_newest_first, OSSFile, R2ConfigData, StorageProvider};
use crate::utils::object_key::encode_key;

const PROVIDER: &str = "Cloudflare R2";

/// R2 accepts any region; `auto` is the documented value
const R2_REGION: &str = "auto";
const R2_SERVICE: &str = "s3";

pub struct R2Storage {
    config: R2ConfigData,
    client: Client,
    signer: SigV4Signer,
    /// Scheme + host, e.g. `https://{account}.r2.cloudflarestorage.com`
    base_url: String,
}

impl R2Storage {
    pub fn new(config: R2ConfigData) -> Self {
        let signer = SigV4Signer::new(
            config.access_key_id.clone(),
            config.access_key_secret.clone(),
            R2_REGION,
            R2_SERVICE,
        );
        let base_url = config.endpoint();
        Self {
            config,
            client: Client::new(),
            signer,
            base_url,
        }
    }

    /// Point the adapter at a different S3-compatible host (tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn host(&self) -> &str {
        self.base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
    }

    fn bucket_uri(&self) -> String {
        format!("/{}", self.config.bucket)
    }

    fn object_uri(&self, key: &str) -> String {
        format!("/{}/{}", self.config.bucket, encode_key(key))
    }

    /// Public URL through the bucket's custom domain, if one is set
    fn custom_domain_url(&self, key: &str) -> Option<String> {
        let domain = self
            .config
            .custom_domain
            .as_deref()
            .map(|d| d.trim().trim_end_matches('/'))
            .filter(|d| !d.is_empty())?;
        let domain = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Some(format!("{}/{}", domain, encode_key(key)))
    }

    /// Sign and send one request
    async fn execute(
        &self,
        method: Method,
        uri: &str,
        query: Vec<(String, String)>,
        extra_headers: BTreeMap<String, String>,
        body: Vec<u8>,
        key: &str,
    ) -> StorageResult<Response> {
        let now = Utc::now();
        let payload_hash = sha256_hex(&body);

        let mut headers = extra_headers;
        headers.insert("host".to_string(), self.host().to_string());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        headers.insert("x-amz-date".to_string(), amz_date(now));

        let authorization =
            self.signer
                .authorization(method.as_str(), uri, &query, &headers, &payload_hash, now)?;

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, uri)
        } else {
            format!("{}{}?{}", self.base_url, uri, canonical_query(&query))
        };

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", authorization);
        for (name, value) in &headers {
            // reqwest derives Host from the URL
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        request = request.body(body);

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
        let mut headers = BTreeMap::new();
        headers.insert(
            "content-type".to_string(),
            guess_content_type(path).to_string(),
        );
        self.execute(
            Method::PUT,
            &self.object_uri(path),
            Vec::new(),
            headers,
            data,
            path,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StorageService for R2Storage {
    fn provider(&self) -> StorageProvider {
        StorageProvider::R2
    }

    async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<OSSFile>> {
        let mut files = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), LIST_PAGE_SIZE.to_string()),
            ];
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                query.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(token) = &token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let body = self
                .execute(
                    Method::GET,
                    &self.bucket_uri(),
                    query,
                    BTreeMap::new(),
                    Vec::new(),
                    prefix.unwrap_or(""),
                )
                .await?
                .text()
                .await?;

            let page = ListBucketResult::parse(&body)?;
            let next = page.continuation().map(str::to_string);
            // Listing URLs are left empty; presigning happens on demand
            files.extend(page.into_files(|key| self.custom_domain_url(key).unwrap_or_default()));

            match next {
                Some(next) => token = Some(next),
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
        self.execute(
            Method::DELETE,
            &self.object_uri(path),
            Vec::new(),
            BTreeMap::new(),
            Vec::new(),
            path,
        )
        .await?;
        log::info!("[storage] Deleted {} from {}", path, PROVIDER);
        Ok(())
    }

    async fn get_url(&self, path: &str) -> StorageResult<String> {
        if let Some(url) = self.custom_domain_url(path) {
            return Ok(url);
        }
        self.signer
            .presign_get(self.host(), &self.object_uri(path), URL_EXPIRES_SECS, Utc::now())
    }

    async fn get_bytes(&self, path: &str) -> StorageResult<Vec<u8>> {
        let bytes = self
            .execute(
                Method::GET,
                &self.object_uri(path),
                Vec::new(),
                BTreeMap::new(),
                Vec::new(),
                path,
            )
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn put_content(&self, path: &str, content: &[u8]) -> StorageResult<()> {
        self.put_object(path, content.to_vec()).await
    }

    async fn copy(&self, source: &str, destination: &str) -> StorageResult<()> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "x-amz-copy-source".to_string(),
            format!("/{}/{}", self.config.bucket, encode_key(source)),
        );
        self.execute(
            Method::PUT,
            &self.object_uri(destination),
            Vec::new(),
            headers,
            Vec::new(),
            destination,
        )
        .await?;
        log::info!("[storage] Copied {} -> {} on {}", source, destination, PROVIDER);
        Ok(())
    }
}
