// Storage data models
// Provider credentials and flattened object listings

use serde::{Deserialize, Serialize};

use crate::utils::object_key;

/// Supported object storage providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    #[default]
    Aliyun,
    R2,
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageProvider::Aliyun => write!(f, "aliyun"),
            StorageProvider::R2 => write!(f, "r2"),
        }
    }
}

impl std::str::FromStr for StorageProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aliyun" | "oss" => Ok(StorageProvider::Aliyun),
            "r2" | "cloudflare" => Ok(StorageProvider::R2),
            other => Err(format!("Unknown storage provider: {}", other)),
        }
    }
}

/// Default Aliyun OSS region
pub const DEFAULT_OSS_REGION: &str = "oss-cn-hangzhou";

/// Supported Aliyun OSS regions (region id, display label)
pub const OSS_REGIONS: &[(&str, &str)] = &[
    ("oss-cn-hangzhou", "华东1 (杭州)"),
    ("oss-cn-shanghai", "华东2 (上海)"),
    ("oss-cn-qingdao", "华北1 (青岛)"),
    ("oss-cn-beijing", "华北2 (北京)"),
    ("oss-cn-zhangjiakou", "华北3 (张家口)"),
    ("oss-cn-huhehaote", "华北5 (呼和浩特)"),
    ("oss-cn-wulanchabu", "华北6 (乌兰察布)"),
    ("oss-cn-shenzhen", "华南1 (深圳)"),
    ("oss-cn-heyuan", "华南2 (河源)"),
    ("oss-cn-guangzhou", "华南3 (广州)"),
    ("oss-cn-chengdu", "西南1 (成都)"),
    ("oss-cn-hongkong", "中国香港"),
    ("oss-ap-southeast-1", "新加坡"),
    ("oss-ap-southeast-2", "澳大利亚 (悉尼)"),
    ("oss-ap-southeast-3", "马来西亚 (吉隆坡)"),
    ("oss-ap-southeast-5", "印度尼西亚 (雅加达)"),
    ("oss-ap-northeast-1", "日本 (东京)"),
    ("oss-us-west-1", "美国 (硅谷)"),
    ("oss-us-east-1", "美国 (弗吉尼亚)"),
    ("oss-eu-central-1", "德国 (法兰克福)"),
    ("oss-eu-west-1", "英国 (伦敦)"),
    ("oss-me-east-1", "阿联酋 (迪拜)"),
];

/// Public endpoint host for an OSS region
pub fn oss_endpoint(region: &str) -> String {
    format!("{}.aliyuncs.com", region)
}

/// Aliyun OSS credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OssConfigData {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    pub region: String,
    /// Endpoint host, defaults to `{region}.aliyuncs.com`
    #[serde(default)]
    pub endpoint: String,
}

impl OssConfigData {
    pub fn new(
        access_key_id: String,
        access_key_secret: String,
        bucket: String,
        region: String,
    ) -> Self {
        let endpoint = oss_endpoint(&region);
        Self {
            access_key_id,
            access_key_secret,
            bucket,
            region,
            endpoint,
        }
    }

    /// Endpoint host with scheme and trailing slashes stripped
    pub fn endpoint_host(&self) -> String {
        let raw = if self.endpoint.trim().is_empty() {
            oss_endpoint(&self.region)
        } else {
            self.endpoint.trim().to_string()
        };
        raw.trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    }
}

/// Cloudflare R2 credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct R2ConfigData {
    pub account_id: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket: String,
    /// Public domain bound to the bucket; enables permanent URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
}

impl R2ConfigData {
    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// Flattened listing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OSSFile {
    /// Full object key
    pub name: String,
    /// Listing URL if the provider returns one (may be empty)
    #[serde(default)]
    pub url: String,
    /// RFC 3339 timestamp
    pub last_modified: String,
    pub size: u64,
    /// Lowercase extension
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

impl OSSFile {
    pub fn new(name: String, url: String, last_modified: String, size: u64) -> Self {
        let file_type = object_key::extension(&name);
        Self {
            name,
            url,
            last_modified,
            size,
            file_type,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        object_key::is_placeholder(&self.name)
    }
}

/// Sort a listing by descending last-modified time
///
/// Timestamps that fail to parse sort last.
pub fn sort_newest_first(files: &mut [OSSFile]) {
    files.sort_by(|a, b| {
        let ta = chrono::DateTime::parse_from_rfc3339(&a.last_modified).ok();
        let tb = chrono::DateTime::parse_from_rfc3339(&b.last_modified).ok();
        tb.cmp(&ta)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trip_str() {
        assert_eq!("aliyun".parse::<StorageProvider>().unwrap(), StorageProvider::Aliyun);
        assert_eq!("R2".parse::<StorageProvider>().unwrap(), StorageProvider::R2);
        assert!("s3".parse::<StorageProvider>().is_err());
        assert_eq!(StorageProvider::R2.to_string(), "r2");
    }

    #[test]
    fn test_oss_config_default_endpoint() {
        let config = OssConfigData::new(
            "id".to_string(),
            "secret".to_string(),
            "bucket".to_string(),
            "oss-cn-beijing".to_string(),
        );
        assert_eq!(config.endpoint, "oss-cn-beijing.aliyuncs.com");
    }

    #[test]
    fn test_oss_endpoint_host_strips_scheme() {
        let mut config = OssConfigData::new(
            "id".to_string(),
            "secret".to_string(),
            "bucket".to_string(),
            DEFAULT_OSS_REGION.to_string(),
        );
        config.endpoint = "https://oss-cn-hangzhou.aliyuncs.com/".to_string();
        assert_eq!(config.endpoint_host(), "oss-cn-hangzhou.aliyuncs.com");
    }

    #[test]
    fn test_sort_newest_first() {
        let mut files = vec![
            OSSFile::new("old.txt".into(), String::new(), "2024-01-01T00:00:00Z".into(), 1),
            OSSFile::new("new.txt".into(), String::new(), "2025-06-01T00:00:00Z".into(), 1),
            OSSFile::new("bad.txt".into(), String::new(), "yesterday".into(), 1),
        ];
        sort_newest_first(&mut files);
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["new.txt", "old.txt", "bad.txt"]);
    }

    #[test]
    fn test_ossfile_serializes_type_field() {
        let file = OSSFile::new("a/b.MD".into(), String::new(), "2025-01-01T00:00:00Z".into(), 3);
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["type"], "md");
        assert_eq!(json["lastModified"], "2025-01-01T00:00:00Z");
    }
}
