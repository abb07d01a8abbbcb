// OpenAI-compatible streaming client
//
// Chat completions are always requested with `stream: true` and consumed as
// server-sent events. Each `data:` frame is handled in arrival order; the
// stream ends at `data: [DONE]` or when the server closes the connection.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::{Deserialize, Serialize};

use super::tool_stream::ToolCallAccumulator;
use super::{AIError, AIResult, ChatProvider, DeltaFn};
use crate::models::{AIConfigData, MessageRole};

/// Terminal SSE payload
const DONE_MARKER: &str = "[DONE]";

/// Name of the file-rewrite tool
pub const UPDATE_FILE_TOOL: &str = "update_file";

/// Message sent to the completions endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// Request types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition {
    name: &'static str,
    description: &'static str,
    parameters: serde_json::Value,
}

fn update_file_tool() -> ToolDefinition {
    ToolDefinition {
        tool_type: "function",
        function: FunctionDefinition {
            name: UPDATE_FILE_TOOL,
            description: "Replace the entire content of the current file with new content.",
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "new_content": {
                        "type": "string",
                        "description": "The complete new content of the file."
                    }
                },
                "required": ["new_content"]
            }),
        },
    }
}

// Stream frame types
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    arguments: Option<String>,
}

impl StreamChunk {
    fn content(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }

    /// `choices[0].delta.tool_calls[0].function.arguments`
    fn tool_arguments(&self) -> Option<&str> {
        self.choices
            .first()?
            .delta
            .tool_calls
            .as_ref()?
            .first()?
            .function
            .as_ref()?
            .arguments
            .as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    config: AIConfigData,
    client: Client,
    authorization: HeaderValue,
}

impl OpenAIProvider {
    /// Fails when the API key cannot be sent as a header value
    pub fn new(config: AIConfigData) -> AIResult<Self> {
        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim())).map_err(|_| {
                AIError::InvalidConfig("API key contains invalid characters".to_string())
            })?;
        authorization.set_sensitive(true);
        Ok(Self {
            config,
            client: Client::new(),
            authorization,
        })
    }

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    /// Map a non-2xx response onto an error
    fn status_error(&self, status: StatusCode, body: &str) -> AIError {
        if let Ok(error) = serde_json::from_str::<OpenAIError>(body) {
            let error_type = error.error.error_type.as_deref().unwrap_or("");
            let code = error
                .error
                .code
                .as_ref()
                .and_then(|c| c.as_str())
                .unwrap_or("");

            if status == StatusCode::UNAUTHORIZED || error_type == "invalid_api_key" {
                return AIError::AuthFailed(error.error.message);
            }
            if status == StatusCode::TOO_MANY_REQUESTS || error_type == "rate_limit_exceeded" {
                return AIError::RateLimited;
            }
            if code == "model_not_found" || error.error.message.contains("does not exist") {
                return AIError::ModelNotFound(self.config.model.clone());
            }
            return AIError::ApiError(error.error.message);
        }

        match status {
            StatusCode::UNAUTHORIZED => AIError::AuthFailed(status.to_string()),
            StatusCode::TOO_MANY_REQUESTS => AIError::RateLimited,
            _ => {
                let reason = status.canonical_reason().unwrap_or("Request failed");
                if body.trim().is_empty() {
                    AIError::ApiError(reason.to_string())
                } else {
                    AIError::ApiError(format!("{} ({})", reason, body.trim()))
                }
            }
        }
    }

    /// Run one streaming request, handing every parsed frame to `on_chunk`
    async fn stream<F>(&self, request: &ChatCompletionRequest<'_>, mut on_chunk: F) -> AIResult<()>
    where
        F: FnMut(&StreamChunk) + Send,
    {
        let builder = self
            .client
            .post(self.config.chat_completions_url())
            .headers(self.auth_headers())
            .json(request);

        let mut source = EventSource::new(builder)
            .map_err(|e| AIError::ConnectionFailed(e.to_string()))?;
        source.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        let mut frames = 0usize;
        let result = loop {
            let Some(event) = source.next().await else {
                break Ok(());
            };
            match event {
                Ok(Event::Open) => {
                    log::debug!("[ai] Stream opened ({})", self.config.model);
                }
                Ok(Event::Message(message)) => {
                    let data = message.data.trim();
                    if data == DONE_MARKER {
                        break Ok(());
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            frames += 1;
                            on_chunk(&chunk);
                        }
                        Err(_) => {
                            if let Ok(error) = serde_json::from_str::<OpenAIError>(data) {
                                break Err(AIError::ApiError(error.error.message));
                            }
                            log::debug!("[ai] Skipping unparseable frame: {}", data);
                        }
                    }
                }
                Err(EventSourceError::StreamEnded) => break Ok(()),
                Err(EventSourceError::InvalidStatusCode(status, response)) => {
                    let body = response.text().await.unwrap_or_default();
                    break Err(self.status_error(status, &body));
                }
                Err(EventSourceError::Transport(e)) => break Err(AIError::from(e)),
                Err(e) => break Err(AIError::StreamError(e.to_string())),
            }
        };
        source.close();

        match &result {
            Ok(()) => log::info!("[ai] Stream finished after {} frames", frames),
            Err(e) => log::warn!("[ai] Stream failed after {} frames: {}", frames, e),
        }
        result
    }
}

#[async_trait]
impl ChatProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn config(&self) -> &AIConfigData {
        &self.config
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        on_delta: &DeltaFn<'_>,
    ) -> AIResult<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
            stream: true,
            tools: None,
            tool_choice: None,
        };

        let mut content = String::new();
        self.stream(&request, |chunk| {
            if let Some(delta) = chunk.content().filter(|d| !d.is_empty()) {
                content.push_str(delta);
                on_delta(delta);
            }
        })
        .await?;
        Ok(content)
    }

    async fn stream_file_update(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        on_update: &DeltaFn<'_>,
    ) -> AIResult<Option<String>> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature,
            stream: true,
            tools: Some(vec![update_file_tool()]),
            tool_choice: Some(serde_json::json!({
                "type": "function",
                "function": { "name": UPDATE_FILE_TOOL }
            })),
        };

        let mut accumulator = ToolCallAccumulator::new();
        // Some endpoints answer in plain content instead of calling the tool
        let mut fallback = String::new();
        self.stream(&request, |chunk| {
            if let Some(fragment) = chunk.tool_arguments() {
                if let Some(preview) = accumulator.push(fragment) {
                    on_update(preview);
                }
            } else if let Some(text) = chunk.content() {
                fallback.push_str(text);
            }
        })
        .await?;

        if accumulator.arguments().is_empty() {
            if fallback.trim().is_empty() {
                return Ok(None);
            }
            log::info!("[ai] Model answered without calling {}", UPDATE_FILE_TOOL);
            return Ok(Some(fallback));
        }
        Ok(accumulator.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(AIConfigData::new(
            "https://api.example.com/v1".to_string(),
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
        ))
        .unwrap()
    }

    #[test]
    fn test_api_key_with_control_characters_is_rejected() {
        let result = OpenAIProvider::new(AIConfigData::new(
            "https://api.example.com/v1".to_string(),
            "sk-\nbroken".to_string(),
            "gpt-4o-mini".to_string(),
        ));
        assert!(matches!(result, Err(AIError::InvalidConfig(_))));

        let headers = provider().auth_headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::new(MessageRole::User, "hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.2,
            stream: true,
            tools: Some(vec![update_file_tool()]),
            tool_choice: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["tools"][0]["function"]["name"], "update_file");
        assert_eq!(
            json["tools"][0]["function"]["parameters"]["required"][0],
            "new_content"
        );
        assert!(json.get("tool_choice").is_none());
    }

    #[test]
    fn test_chunk_accessors() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"new_"}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.tool_arguments(), Some("{\"new_"));
        assert_eq!(chunk.content(), None);

        let empty: StreamChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty.tool_arguments(), None);
    }

    #[test]
    fn test_status_error_mapping() {
        let provider = provider();
        let body = r#"{"error":{"message":"Incorrect API key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        assert!(matches!(
            provider.status_error(StatusCode::UNAUTHORIZED, body),
            AIError::AuthFailed(_)
        ));
        assert!(matches!(
            provider.status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            AIError::RateLimited
        ));
        match provider.status_error(StatusCode::INTERNAL_SERVER_ERROR, "") {
            AIError::ApiError(message) => assert_eq!(message, "Internal Server Error"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
