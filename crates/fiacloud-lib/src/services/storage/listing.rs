// XML payloads shared by the OSS and S3-compatible APIs

use serde::Deserialize;

use super::error::{StorageError, StorageResult};
use crate::models::OSSFile;

/// `ListBucketResult` (OSS ListObjects and S3 ListObjectsV2)
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ListBucketResult {
    #[serde(default)]
    pub contents: Vec<ListedObject>,
    #[serde(default)]
    pub is_truncated: bool,
    /// OSS pagination marker
    #[serde(default)]
    pub next_marker: Option<String>,
    /// S3 v2 pagination token
    #[serde(default)]
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListedObject {
    pub key: String,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub size: u64,
}

impl ListBucketResult {
    pub fn parse(xml: &str) -> StorageResult<Self> {
        quick_xml::de::from_str(xml)
            .map_err(|e| StorageError::ParseError(format!("Invalid listing XML: {}", e)))
    }

    /// Marker to continue from, if the listing was truncated
    pub fn continuation(&self) -> Option<&str> {
        if !self.is_truncated {
            return None;
        }
        self.next_continuation_token
            .as_deref()
            .or(self.next_marker.as_deref())
            .filter(|m| !m.is_empty())
    }

    pub fn into_files(self, url_for: impl Fn(&str) -> String) -> Vec<OSSFile> {
        self.contents
            .into_iter()
            .map(|obj| {
                let url = url_for(&obj.key);
                OSSFile::new(obj.key, url, obj.last_modified, obj.size)
            })
            .collect()
    }
}

/// `<Error>` body returned by both APIs on failure
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    /// Best-effort parse; unparseable bodies become the raw message
    pub fn parse(body: &str) -> Self {
        match quick_xml::de::from_str::<Self>(body) {
            Ok(parsed) if !(parsed.code.is_empty() && parsed.message.is_empty()) => parsed,
            _ => Self {
                code: String::new(),
                message: body.trim().to_string(),
            },
        }
    }
}

/// Map a failed HTTP response onto a storage error
pub fn error_from_status(provider: &str, status: u16, key: &str, body: &str) -> StorageError {
    let parsed = ErrorResponse::parse(body);
    match status {
        401 | 403 => StorageError::AuthFailed {
            provider: provider.to_string(),
            message: if parsed.message.is_empty() {
                parsed.code
            } else {
                parsed.message
            },
        },
        404 => StorageError::NotFound {
            key: key.to_string(),
        },
        _ => StorageError::ApiError {
            provider: provider.to_string(),
            code: if parsed.code.is_empty() {
                status.to_string()
            } else {
                parsed.code
            },
            message: parsed.message,
        },
    }
}
