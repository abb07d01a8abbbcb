// Storage Service Error Types

use thiserror::Error;

/// Storage Service Error
#[derive(Error, Debug)]
pub enum StorageError {
    /// Provider could not be reached
    #[error("Cannot connect to {provider}: {message}")]
    ConnectionFailed { provider: String, message: String },

    /// Credentials rejected
    #[error("Authentication failed for {provider}: {message}")]
    AuthFailed { provider: String, message: String },

    /// Object does not exist
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// API error from provider
    #[error("{provider} API error ({code}): {message}")]
    ApiError {
        provider: String,
        code: String,
        message: String,
    },

    /// No storage provider has been configured
    #[error("Storage is not configured")]
    NotConfigured,

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Object key or folder name is unusable
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Response could not be parsed
    #[error("Response parse error: {0}")]
    ParseError(String),

    /// Request signing failed
    #[error("Request signing failed: {0}")]
    SigningError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error codes for front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    ConnectionFailed,
    AuthFailed,
    NotFound,
    ApiError,
    NotConfigured,
    InvalidConfig,
    InvalidPath,
    ParseError,
    SigningError,
    IoError,
    NetworkError,
}

impl StorageErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageErrorCode::ConnectionFailed => "STORAGE_CONNECTION_FAILED",
            StorageErrorCode::AuthFailed => "STORAGE_AUTH_FAILED",
            StorageErrorCode::NotFound => "STORAGE_NOT_FOUND",
            StorageErrorCode::ApiError => "STORAGE_API_ERROR",
            StorageErrorCode::NotConfigured => "STORAGE_NOT_CONFIGURED",
            StorageErrorCode::InvalidConfig => "STORAGE_INVALID_CONFIG",
            StorageErrorCode::InvalidPath => "STORAGE_INVALID_PATH",
            StorageErrorCode::ParseError => "STORAGE_PARSE_ERROR",
            StorageErrorCode::SigningError => "STORAGE_SIGNING_ERROR",
            StorageErrorCode::IoError => "STORAGE_IO_ERROR",
            StorageErrorCode::NetworkError => "STORAGE_NETWORK_ERROR",
        }
    }
}

impl StorageError {
    pub fn code(&self) -> StorageErrorCode {
        match self {
            StorageError::ConnectionFailed { .. } => StorageErrorCode::ConnectionFailed,
            StorageError::AuthFailed { .. } => StorageErrorCode::AuthFailed,
            StorageError::NotFound { .. } => StorageErrorCode::NotFound,
            StorageError::ApiError { .. } => StorageErrorCode::ApiError,
            StorageError::NotConfigured => StorageErrorCode::NotConfigured,
            StorageError::InvalidConfig { .. } => StorageErrorCode::InvalidConfig,
            StorageError::InvalidPath(_) => StorageErrorCode::InvalidPath,
            StorageError::ParseError(_) => StorageErrorCode::ParseError,
            StorageError::SigningError(_) => StorageErrorCode::SigningError,
            StorageError::IoError(_) => StorageErrorCode::IoError,
            StorageError::NetworkError(_) => StorageErrorCode::NetworkError,
        }
    }

    /// Convert to a user-friendly error message for front ends
    pub fn to_user_message(&self) -> String {
        self.to_string()
    }
}

impl From<StorageError> for String {
    fn from(err: StorageError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StorageError::NotConfigured.code().as_str(),
            "STORAGE_NOT_CONFIGURED"
        );
        let err = StorageError::NotFound {
            key: "docs/a.txt".to_string(),
        };
        assert_eq!(err.code(), StorageErrorCode::NotFound);
        assert!(err.to_user_message().contains("docs/a.txt"));
    }
}
