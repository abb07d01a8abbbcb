// Request signing for object storage REST APIs
//
// - Aliyun OSS: header signature v1 (HMAC-SHA1)
// - Cloudflare R2: AWS Signature Version 4 (HMAC-SHA256)

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::error::{StorageError, StorageResult};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Payload hash used for presigned URLs
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

const SIGV4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub fn hmac_sha1(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| StorageError::SigningError(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| StorageError::SigningError(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lowercase hex SHA-256 of a payload
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// RFC 1123 date as required by the OSS `Date` header
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

// ============================================================================
// Aliyun OSS
// ============================================================================

/// Build the OSS v1 string to sign
///
/// `oss_headers` are the `x-oss-*` headers; they are lowercased and sorted.
/// `resource` is `/{bucket}/{key}` with the raw (unencoded) key.
pub fn oss_string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    oss_headers: &BTreeMap<String, String>,
    resource: &str,
) -> String {
    let mut canonical_headers = String::new();
    for (name, value) in oss_headers {
        canonical_headers.push_str(&name.to_lowercase());
        canonical_headers.push(':');
        canonical_headers.push_str(value.trim());
        canonical_headers.push('\n');
    }

    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        verb, content_md5, content_type, date, canonical_headers, resource
    )
}

/// Base64 HMAC-SHA1 signature over an OSS string to sign
pub fn oss_signature(secret: &str, string_to_sign: &str) -> StorageResult<String> {
    let digest = hmac_sha1(secret.as_bytes(), string_to_sign.as_bytes())?;
    Ok(BASE64.encode(digest))
}

/// `Authorization` header value for OSS
pub fn oss_authorization(
    access_key_id: &str,
    secret: &str,
    string_to_sign: &str,
) -> StorageResult<String> {
    Ok(format!(
        "OSS {}:{}",
        access_key_id,
        oss_signature(secret, string_to_sign)?
    ))
}

// ============================================================================
// AWS Signature Version 4
// ============================================================================

/// SigV4 signer for one credential/region/service triple
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key_id: String,
    secret_access_key: String,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// `{date}/{region}/{service}/aws4_request`
    pub fn scope(&self, date: &str) -> String {
        format!("{}/{}/{}/aws4_request", date, self.region, self.service)
    }

    /// Derive the signing key for a `YYYYMMDD` date
    pub fn signing_key(&self, date: &str) -> StorageResult<Vec<u8>> {
        let k_secret = format!("AWS4{}", self.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }

    /// Sign a request and return the `Authorization` header value
    ///
    /// `headers` must already contain every header to be signed (at least
    /// `host`, `x-amz-date` and `x-amz-content-sha256`).
    pub fn authorization(
        &self,
        method: &str,
        canonical_uri: &str,
        query: &[(String, String)],
        headers: &BTreeMap<String, String>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<String> {
        let amz_date = amz_date(now);
        let date = short_date(now);
        let (canonical, signed_headers) =
            canonical_request(method, canonical_uri, query, headers, payload_hash);
        let scope = self.scope(&date);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let signature = hex::encode(hmac_sha256(&self.signing_key(&date)?, to_sign.as_bytes())?);

        Ok(format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGV4_ALGORITHM, self.access_key_id, scope, signed_headers, signature
        ))
    }

    /// Build a presigned GET URL signed over the `host` header only
    pub fn presign_get(
        &self,
        host: &str,
        canonical_uri: &str,
        expires_secs: u64,
        now: DateTime<Utc>,
    ) -> StorageResult<String> {
        let amz_date = amz_date(now);
        let date = short_date(now);
        let scope = self.scope(&date);

        let query = vec![
            ("X-Amz-Algorithm".to_string(), SIGV4_ALGORITHM.to_string()),
            (
                "X-Amz-Credential".to_string(),
                format!("{}/{}", self.access_key_id, scope),
            ),
            ("X-Amz-Date".to_string(), amz_date.clone()),
            ("X-Amz-Expires".to_string(), expires_secs.to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host.to_string());

        let (canonical, _) =
            canonical_request("GET", canonical_uri, &query, &headers, UNSIGNED_PAYLOAD);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let signature = hex::encode(hmac_sha256(&self.signing_key(&date)?, to_sign.as_bytes())?);

        Ok(format!(
            "https://{}{}?{}&X-Amz-Signature={}",
            host,
            canonical_uri,
            canonical_query(&query),
            signature
        ))
    }
}

/// `YYYYMMDDTHHMMSSZ`
pub fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// `YYYYMMDD`
pub fn short_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Sorted, percent-encoded query string
pub fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical request and the signed header list
pub fn canonical_request(
    method: &str,
    canonical_uri: &str,
    query: &[(String, String)],
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> (String, String) {
    let mut canonical_headers = String::new();
    let mut names = Vec::with_capacity(headers.len());
    // BTreeMap keeps names sorted; names are expected lowercase already
    for (name, value) in headers {
        let name = name.to_lowercase();
        canonical_headers.push_str(&name);
        canonical_headers.push(':');
        canonical_headers.push_str(value.trim());
        canonical_headers.push('\n');
        names.push(name);
    }
    let signed_headers = names.join(";");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        canonical_uri,
        canonical_query(query),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    (canonical, signed_headers)
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        SIGV4_ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}
