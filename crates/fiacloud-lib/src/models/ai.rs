// AI Integration data models
// OpenAI-compatible endpoint configuration

use serde::{Deserialize, Serialize};

/// Default endpoint for OpenAI-compatible services
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Temperature used for conversational chat
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Temperature used for file edits
pub const EDIT_TEMPERATURE: f32 = 0.2;

/// OpenAI-compatible service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AIConfigData {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AIConfigData {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
        }
    }

    /// Full URL of the chat completions endpoint
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for AIConfigData {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AI_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_AI_MODEL.to_string(),
        }
    }
}
