// AI Service Module
// Streaming chat and whole-file edits against OpenAI-compatible endpoints

pub mod chat;
pub mod edit;
pub mod error;
pub mod openai;
pub mod prompt;
pub mod tool_stream;

use std::sync::Arc;

use async_trait::async_trait;

pub use chat::ChatService;
pub use edit::{EditController, EditSnapshot, EditTicket};
pub use error::{AIError, AIErrorCode, AIResult};
pub use openai::{ChatMessage, OpenAIProvider};
pub use tool_stream::ToolCallAccumulator;

use crate::models::AIConfigData;

/// Streaming text callback
pub type DeltaFn<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Trait for chat completion providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the current configuration
    fn config(&self) -> &AIConfigData;

    /// Stream a plain completion
    ///
    /// `on_delta` receives each content fragment in order; the full text is
    /// returned once the stream ends.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        on_delta: &DeltaFn<'_>,
    ) -> AIResult<String>;

    /// Stream an `update_file` tool call
    ///
    /// `on_update` receives the decoded file content so far whenever it grows.
    /// Returns the exact final content, or `None` if the model produced none.
    async fn stream_file_update(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        on_update: &DeltaFn<'_>,
    ) -> AIResult<Option<String>>;
}

/// Shared provider handle
pub type SharedChatProvider = Arc<dyn ChatProvider>;

/// Factory function to create a provider from config
pub fn create_provider(config: AIConfigData) -> AIResult<SharedChatProvider> {
    if config.api_key.trim().is_empty() {
        return Err(AIError::InvalidConfig("API key cannot be empty".to_string()));
    }
    if config.model.trim().is_empty() {
        return Err(AIError::InvalidConfig("Model cannot be empty".to_string()));
    }
    let base = config.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(AIError::InvalidConfig(format!(
            "Base URL must start with http:// or https://: {}",
            base
        )));
    }
    Ok(Arc::new(OpenAIProvider::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_error_code_str() {
        assert_eq!(AIErrorCode::EditInProgress.as_str(), "AI_EDIT_IN_PROGRESS");
        assert_eq!(AIError::NotConfigured.code(), AIErrorCode::NotConfigured);
    }

    #[test]
    fn test_not_configured_message() {
        assert_eq!(
            AIError::NotConfigured.to_user_message(),
            "Please configure AI settings first."
        );
    }

    #[test]
    fn test_create_provider_validates_config() {
        let mut config = AIConfigData::default();
        assert!(create_provider(config.clone()).is_err());

        config.api_key = "sk-test".to_string();
        let provider = create_provider(config.clone()).unwrap();
        assert_eq!(provider.name(), "OpenAI");

        let mut bad_key = config.clone();
        bad_key.api_key = "sk-\u{7f}".to_string();
        assert!(matches!(
            create_provider(bad_key),
            Err(AIError::InvalidConfig(_))
        ));

        config.base_url = "api.example.com".to_string();
        assert!(matches!(
            create_provider(config),
            Err(AIError::InvalidConfig(_))
        ));
    }
}
