// Streaming chat and edit requests against a local chat-completions endpoint

mod common;

use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use fiacloud_lib::models::{AIConfigData, MessageRole, EDIT_TEMPERATURE};
use fiacloud_lib::repositories::{ConfigRepository, ConversationRepository};
use fiacloud_lib::services::ai::{
    create_provider, prompt, AIError, ChatMessage, ChatProvider, ChatService,
};
use fiacloud_lib::services::crypto::ConfigCipher;
use fiacloud_lib::services::storage::{FileManager, MemoryStorage};
use fiacloud_lib::utils::store::MemoryStore;
use serde_json::Value;

use common::{content_frame, serve, sse_body, tool_frame};

#[derive(Clone, Default)]
struct Captured {
    bodies: Arc<Mutex<Vec<Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

/// Endpoint answering every request with `status` and the given frames
async fn completions(status: StatusCode, frames: Vec<Value>, captured: Captured) -> String {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let frames = frames.clone();
            let captured = captured.clone();
            async move {
                captured.bodies.lock().unwrap().push(body);
                *captured.authorization.lock().unwrap() = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if status.is_success() {
                    (
                        status,
                        [(header::CONTENT_TYPE, "text/event-stream")],
                        sse_body(&frames),
                    )
                        .into_response()
                } else {
                    (
                        status,
                        [(header::CONTENT_TYPE, "application/json")],
                        r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#,
                    )
                        .into_response()
                }
            }
        }),
    );
    format!("{}/v1", serve(router).await)
}

fn config(base_url: String) -> AIConfigData {
    AIConfigData::new(base_url, "sk-test".to_string(), "gpt-4o-mini".to_string())
}

#[tokio::test]
async fn test_tool_call_fragments_stream_live_previews() {
    let captured = Captured::default();
    let base = completions(
        StatusCode::OK,
        vec![
            tool_frame("{\"new_content\": \"Hel"),
            tool_frame("lo, w"),
            tool_frame("orld!\"}"),
        ],
        captured.clone(),
    )
    .await;

    let provider = create_provider(config(base)).unwrap();
    let previews = Mutex::new(Vec::new());
    let on_update = |p: &str| previews.lock().unwrap().push(p.to_string());
    let messages = prompt::edit_messages("greet", "a.txt", "Hi");

    let result = provider
        .stream_file_update(&messages, EDIT_TEMPERATURE, &on_update)
        .await
        .unwrap();

    assert_eq!(result.as_deref(), Some("Hello, world!"));
    assert_eq!(
        previews.into_inner().unwrap(),
        vec!["Hel", "Hello, w", "Hello, world!"]
    );

    let body = captured.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["tool_choice"]["function"]["name"], "update_file");
    assert_eq!(body["tools"][0]["function"]["name"], "update_file");
    assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(
        captured.authorization.lock().unwrap().as_deref(),
        Some("Bearer sk-test")
    );
}

#[tokio::test]
async fn test_escaped_content_survives_one_char_fragments() {
    let value = "line1\n\t\"quoted\" \\ end";
    let json = serde_json::json!({ "new_content": value }).to_string();
    let frames: Vec<Value> = json
        .chars()
        .map(|c| tool_frame(&c.to_string()))
        .collect();
    let base = completions(StatusCode::OK, frames, Captured::default()).await;

    let provider = create_provider(config(base)).unwrap();
    let noop = |_: &str| {};
    let messages = [ChatMessage::new(MessageRole::User, "rewrite")];
    let result = provider
        .stream_file_update(&messages, EDIT_TEMPERATURE, &noop)
        .await
        .unwrap();
    assert_eq!(result.as_deref(), Some(value));
}

#[tokio::test]
async fn test_error_status_fails_before_any_callback() {
    let base = completions(StatusCode::UNAUTHORIZED, Vec::new(), Captured::default()).await;
    let provider = create_provider(config(base)).unwrap();

    let called = Mutex::new(false);
    let on_delta = |_: &str| *called.lock().unwrap() = true;
    let err = provider
        .stream_chat(&prompt::edit_messages("x", "a", "b"), 0.7, &on_delta)
        .await
        .unwrap_err();

    assert!(matches!(err, AIError::AuthFailed(_)));
    assert!(!*called.lock().unwrap());
}

#[tokio::test]
async fn test_chat_service_streams_into_conversation() {
    let captured = Captured::default();
    let base = completions(
        StatusCode::OK,
        vec![content_frame("Hello"), content_frame(" world")],
        captured.clone(),
    )
    .await;

    let store = MemoryStore::shared();
    let config_repo = ConfigRepository::new(store.clone(), ConfigCipher::from_secret("it"));
    config_repo.save_ai_config(&config(base)).unwrap();
    let chat = ChatService::new(config_repo, ConversationRepository::new(store.clone()));
    chat.add_context_file("notes.md", "# Notes").unwrap();

    let reply = chat.send_message("hi").await.unwrap();
    assert_eq!(reply.content, "Hello world");

    let body = captured.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(body["messages"][0]["content"]
        .as_str()
        .unwrap()
        .contains("--- File: notes.md ---"));
    assert_eq!(body["messages"][1]["content"], "hi");
    assert!(body.get("tools").is_none());

    let saved = ConversationRepository::new(store).load_all();
    assert_eq!(saved[0].messages[1].content, "Hello world");
}

#[tokio::test]
async fn test_edit_accept_writes_back_to_storage() {
    let base = completions(
        StatusCode::OK,
        vec![tool_frame("{\"new_content\":\"a\\nx\\nc\"}")],
        Captured::default(),
    )
    .await;

    let store = MemoryStore::shared();
    let config_repo = ConfigRepository::new(store.clone(), ConfigCipher::from_secret("it"));
    config_repo.save_ai_config(&config(base)).unwrap();
    let chat = ChatService::new(config_repo, ConversationRepository::new(store));

    let files = FileManager::new(Arc::new(MemoryStorage::new()));
    files.save_file_content("docs/a.txt", "a\nb\nc").await.unwrap();

    let noop = |_: &str| {};
    let proposed = chat
        .generate_edit("replace b", "docs/a.txt", "a\nb\nc", &noop)
        .await
        .unwrap();
    assert_eq!(proposed, "a\nx\nc");

    chat.edit().accept_and_save(&files).await.unwrap();
    assert_eq!(files.get_file_content("docs/a.txt").await.unwrap(), "a\nx\nc");
}
