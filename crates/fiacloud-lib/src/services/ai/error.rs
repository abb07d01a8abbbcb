// AI Service Error Types

use thiserror::Error;

use crate::services::storage::StorageError;

/// AI Service Error
#[derive(Error, Debug)]
pub enum AIError {
    /// No AI endpoint configured
    #[error("Please configure AI settings first.")]
    NotConfigured,

    /// Connection failed
    #[error("Cannot connect to AI service: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Invalid or expired API key: {0}")]
    AuthFailed(String),

    /// Rate limited
    #[error("API rate limit exceeded, please try again later")]
    RateLimited,

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// API error from provider
    #[error("API Error: {0}")]
    ApiError(String),

    /// JSON parsing error
    #[error("Response parse error: {0}")]
    ParseError(String),

    /// Request timeout
    #[error("AI service response timeout")]
    Timeout,

    /// An edit is already streaming or waiting for review
    #[error("An AI edit is already in progress")]
    EditInProgress,

    /// Accept/reject without a pending edit
    #[error("No AI edit is pending")]
    NoPendingEdit,

    /// Event stream broke mid-response
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Saving the edited file failed
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<reqwest::Error> for AIError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AIError::Timeout
        } else if err.is_connect() {
            AIError::ConnectionFailed(err.to_string())
        } else {
            AIError::ApiError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AIError {
    fn from(err: serde_json::Error) -> Self {
        AIError::ParseError(err.to_string())
    }
}

impl From<StorageError> for AIError {
    fn from(err: StorageError) -> Self {
        AIError::StorageError(err.to_string())
    }
}

/// Result type for AI operations
pub type AIResult<T> = Result<T, AIError>;

/// AI Error codes for front ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIErrorCode {
    NotConfigured,
    ConnectionFailed,
    AuthFailed,
    RateLimited,
    ModelNotFound,
    ApiError,
    ParseError,
    Timeout,
    EditInProgress,
    NoPendingEdit,
    StreamError,
    InvalidConfig,
    StorageError,
}

impl AIErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AIErrorCode::NotConfigured => "AI_NOT_CONFIGURED",
            AIErrorCode::ConnectionFailed => "AI_CONNECTION_FAILED",
            AIErrorCode::AuthFailed => "AI_AUTH_FAILED",
            AIErrorCode::RateLimited => "AI_RATE_LIMITED",
            AIErrorCode::ModelNotFound => "AI_MODEL_NOT_FOUND",
            AIErrorCode::ApiError => "AI_API_ERROR",
            AIErrorCode::ParseError => "AI_PARSE_ERROR",
            AIErrorCode::Timeout => "AI_TIMEOUT",
            AIErrorCode::EditInProgress => "AI_EDIT_IN_PROGRESS",
            AIErrorCode::NoPendingEdit => "AI_NO_PENDING_EDIT",
            AIErrorCode::StreamError => "AI_STREAM_ERROR",
            AIErrorCode::InvalidConfig => "AI_INVALID_CONFIG",
            AIErrorCode::StorageError => "AI_STORAGE_ERROR",
        }
    }
}

impl AIError {
    pub fn code(&self) -> AIErrorCode {
        match self {
            AIError::NotConfigured => AIErrorCode::NotConfigured,
            AIError::ConnectionFailed(_) => AIErrorCode::ConnectionFailed,
            AIError::AuthFailed(_) => AIErrorCode::AuthFailed,
            AIError::RateLimited => AIErrorCode::RateLimited,
            AIError::ModelNotFound(_) => AIErrorCode::ModelNotFound,
            AIError::ApiError(_) => AIErrorCode::ApiError,
            AIError::ParseError(_) => AIErrorCode::ParseError,
            AIError::Timeout => AIErrorCode::Timeout,
            AIError::EditInProgress => AIErrorCode::EditInProgress,
            AIError::NoPendingEdit => AIErrorCode::NoPendingEdit,
            AIError::StreamError(_) => AIErrorCode::StreamError,
            AIError::InvalidConfig(_) => AIErrorCode::InvalidConfig,
            AIError::StorageError(_) => AIErrorCode::StorageError,
        }
    }

    /// Convert to a user-friendly error message for front ends
    pub fn to_user_message(&self) -> String {
        self.to_string()
    }
}

impl From<AIError> for String {
    fn from(err: AIError) -> Self {
        err.to_string()
    }
}
