// Chat Service
// Conversation management, streamed replies and AI file edits

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::prompt::{chat_system_prompt, edit_messages, strip_code_fence};
use super::{
    create_provider, AIError, AIResult, ChatMessage, DeltaFn, EditController,
    SharedChatProvider,
};
use crate::models::{
    title_from, Conversation, Message, MessageRole, CHAT_TEMPERATURE,
    DEFAULT_CONVERSATION_TITLE, EDIT_TEMPERATURE,
};
use crate::repositories::{ConfigRepository, ConversationRepository};
use crate::utils::object_key;
use crate::utils::store::{StoreChange, KEY_CONVERSATIONS};

/// Title length for a conversation created by its first message
const NEW_TITLE_CHARS: usize = 20;
/// Title length when a default-titled conversation gets its first message
const RETITLE_CHARS: usize = 30;

#[derive(Debug, Default)]
struct ChatState {
    /// Newest first
    conversations: Vec<Conversation>,
    current_id: Option<String>,
    context_files: Vec<(String, String)>,
    edit_mode: bool,
}

impl ChatState {
    fn current_mut(&mut self) -> Option<&mut Conversation> {
        let id = self.current_id.as_deref()?;
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Current conversation, created from `first_message` if there is none
    fn ensure_current(&mut self, first_message: &str) -> &mut Conversation {
        let exists = self
            .current_id
            .as_deref()
            .map(|id| self.conversations.iter().any(|c| c.id == id))
            .unwrap_or(false);

        if !exists {
            let conversation = Conversation::with_title(title_from(first_message, NEW_TITLE_CHARS));
            self.current_id = Some(conversation.id.clone());
            self.conversations.insert(0, conversation);
            return &mut self.conversations[0];
        }

        let id = self.current_id.clone().unwrap_or_default();
        let index = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .unwrap_or(0);
        let conversation = &mut self.conversations[index];
        if conversation.title == DEFAULT_CONVERSATION_TITLE && conversation.messages.is_empty() {
            conversation.title = title_from(first_message, RETITLE_CHARS);
        }
        conversation
    }

    fn message_mut(&mut self, conversation_id: &str, index: usize) -> Option<&mut Message> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .and_then(|c| c.messages.get_mut(index))
    }
}

/// Chat sessions backed by the conversation repository
pub struct ChatService {
    config: ConfigRepository,
    history: ConversationRepository,
    provider: Option<SharedChatProvider>,
    edit: EditController,
    state: Mutex<ChatState>,
}

impl ChatService {
    pub fn new(config: ConfigRepository, history: ConversationRepository) -> Self {
        let conversations = history.load_all();
        Self {
            config,
            history,
            provider: None,
            edit: EditController::new(),
            state: Mutex::new(ChatState {
                conversations,
                ..ChatState::default()
            }),
        }
    }

    /// Use `provider` instead of building one from the stored AI config
    pub fn with_provider(mut self, provider: SharedChatProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn edit(&self) -> &EditController {
        &self.edit
    }

    fn lock(&self) -> AIResult<MutexGuard<'_, ChatState>> {
        self.state
            .lock()
            .map_err(|_| AIError::StreamError("chat state lock poisoned".to_string()))
    }

    fn resolve_provider(&self) -> AIResult<SharedChatProvider> {
        if let Some(provider) = &self.provider {
            return Ok(provider.clone());
        }
        match self.config.load_ai_config() {
            Some(config) if !config.api_key.trim().is_empty() => create_provider(config),
            _ => Err(AIError::NotConfigured),
        }
    }

    fn persist(&self, state: &ChatState) {
        if let Err(e) = self.history.save_all(&state.conversations) {
            log::error!("[ai] Failed to save conversations: {}", e);
        }
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock()
            .map(|s| s.conversations.clone())
            .unwrap_or_default()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        let mut state = self.lock().ok()?;
        state.current_mut().cloned()
    }

    /// Start an empty conversation and make it current
    pub fn start_new_conversation(&self) -> AIResult<Conversation> {
        self.edit.cancel();
        let mut state = self.lock()?;
        state.edit_mode = false;
        let conversation = Conversation::new();
        state.current_id = Some(conversation.id.clone());
        state.conversations.insert(0, conversation.clone());
        self.persist(&state);
        Ok(conversation)
    }

    /// Switch to an existing conversation; returns false for unknown ids
    pub fn select_conversation(&self, id: &str) -> AIResult<bool> {
        self.edit.cancel();
        let mut state = self.lock()?;
        state.edit_mode = false;
        if !state.conversations.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        state.current_id = Some(id.to_string());
        Ok(true)
    }

    pub fn delete_conversation(&self, id: &str) -> AIResult<bool> {
        let mut state = self.lock()?;
        let before = state.conversations.len();
        state.conversations.retain(|c| c.id != id);
        if state.conversations.len() == before {
            return Ok(false);
        }
        if state.current_id.as_deref() == Some(id) {
            state.current_id = None;
        }
        self.persist(&state);
        log::info!("[ai] Deleted conversation {}", id);
        Ok(true)
    }

    /// Append a message to the current conversation, creating one if needed
    pub fn add_message(&self, message: Message) -> AIResult<()> {
        let mut state = self.lock()?;
        let title_source = message.content.clone();
        state.ensure_current(&title_source).messages.push(message);
        self.persist(&state);
        Ok(())
    }

    // =========================================================================
    // Context files
    // =========================================================================

    /// Add a file to the chat context; a name already present is kept as is
    pub fn add_context_file(&self, name: &str, content: &str) -> AIResult<bool> {
        let mut state = self.lock()?;
        if state.context_files.iter().any(|(n, _)| n == name) {
            return Ok(false);
        }
        state
            .context_files
            .push((name.to_string(), content.to_string()));
        Ok(true)
    }

    pub fn remove_context_file(&self, name: &str) -> AIResult<()> {
        self.lock()?.context_files.retain(|(n, _)| n != name);
        Ok(())
    }

    pub fn context_files(&self) -> Vec<(String, String)> {
        self.lock()
            .map(|s| s.context_files.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Streaming chat
    // =========================================================================

    /// Send `content` and stream the assistant reply into the conversation
    ///
    /// Failures never propagate as `Err`; they end up as the assistant
    /// message text, which is also returned.
    pub async fn send_message(&self, content: &str) -> AIResult<Message> {
        self.send_message_streaming(content, &|_: &str| {}).await
    }

    /// `send_message`, additionally handing every reply fragment to `on_delta`
    pub async fn send_message_streaming(
        &self,
        content: &str,
        on_delta: &DeltaFn<'_>,
    ) -> AIResult<Message> {
        let provider = self.resolve_provider();

        let (conversation_id, reply_index, request) = {
            let mut state = self.lock()?;
            let context = state.context_files.clone();
            let conversation = state.ensure_current(content);
            conversation.messages.push(Message::user(content));

            let provider = match &provider {
                Ok(provider) => provider,
                Err(AIError::NotConfigured) => {
                    let reply = Message::assistant(AIError::NotConfigured.to_string());
                    conversation.messages.push(reply.clone());
                    self.persist(&state);
                    return Ok(reply);
                }
                Err(e) => {
                    let reply = Message::assistant(format!("Error: {}", e));
                    conversation.messages.push(reply.clone());
                    self.persist(&state);
                    return Ok(reply);
                }
            };

            let mut request = vec![ChatMessage::new(
                MessageRole::System,
                chat_system_prompt(&context),
            )];
            request.extend(
                conversation
                    .messages
                    .iter()
                    .map(|m| ChatMessage::new(m.role, m.content.clone())),
            );
            conversation.messages.push(Message::assistant(""));

            let id = conversation.id.clone();
            let index = conversation.messages.len() - 1;
            log::info!(
                "[ai] Sending {} messages via {} ({})",
                request.len(),
                provider.name(),
                provider.config().model
            );
            self.persist(&state);
            (id, index, request)
        };

        let provider = provider?;
        let streamed = Mutex::new(String::new());
        let forward = |delta: &str| {
            on_delta(delta);
            let Ok(mut text) = streamed.lock() else {
                return;
            };
            text.push_str(delta);
            if let Ok(mut state) = self.state.lock() {
                // The conversation may have been deleted mid-stream
                if let Some(message) = state.message_mut(&conversation_id, reply_index) {
                    message.content = text.clone();
                }
            }
        };

        let result = provider
            .stream_chat(&request, CHAT_TEMPERATURE, &forward)
            .await;

        let reply = match result {
            Ok(full) => Message::assistant(full),
            Err(e) => {
                log::error!("[ai] Chat failed: {}", e);
                Message::assistant(format!("Error: {}", e))
            }
        };

        let mut state = self.lock()?;
        if let Some(message) = state.message_mut(&conversation_id, reply_index) {
            *message = reply.clone();
        }
        self.persist(&state);
        Ok(reply)
    }

    // =========================================================================
    // Edit mode
    // =========================================================================

    pub fn is_edit_mode(&self) -> bool {
        self.lock().map(|s| s.edit_mode).unwrap_or(false)
    }

    /// Flip edit mode; any pending edit is dropped either way
    pub fn toggle_edit_mode(&self) -> AIResult<bool> {
        self.edit.cancel();
        let mut state = self.lock()?;
        state.edit_mode = !state.edit_mode;
        Ok(state.edit_mode)
    }

    /// Stream a whole-file rewrite of `file_key` into the edit session
    ///
    /// `on_update` sees each live preview while the session is current.
    /// Returns the final content, which then waits in the edit controller
    /// for review.
    pub async fn generate_edit(
        &self,
        instruction: &str,
        file_key: &str,
        content: &str,
        on_update: &DeltaFn<'_>,
    ) -> AIResult<String> {
        let ticket = self.edit.begin(file_key, content)?;
        self.add_message(Message::user(instruction))?;

        let provider = match self.resolve_provider() {
            Ok(provider) => provider,
            Err(e) => {
                ticket.fail();
                let text = match &e {
                    AIError::NotConfigured => e.to_string(),
                    other => format!("Error: {}", other),
                };
                self.add_message(Message::assistant(text))?;
                return Err(e);
            }
        };

        let file_name = object_key::file_name(file_key);
        let messages = edit_messages(instruction, file_name, content);
        let forward = |preview: &str| {
            if ticket.update(preview) {
                on_update(preview);
            }
        };

        log::info!("[edit] Generating edit for {}", file_key);
        let result = provider
            .stream_file_update(&messages, EDIT_TEMPERATURE, &forward)
            .await
            .and_then(|content| {
                content.ok_or_else(|| {
                    AIError::ParseError("model returned no file content".to_string())
                })
            });

        match result {
            Ok(raw) => {
                let updated = strip_code_fence(&raw);
                if ticket.finish(&updated) {
                    self.add_message(Message::edit_card(format!(
                        "Updated {} based on your instructions.",
                        file_name
                    )))?;
                } else {
                    log::info!("[edit] Session {} ended before the edit finished", ticket.epoch());
                }
                Ok(updated)
            }
            Err(e) => {
                log::error!("[edit] Edit failed: {}", e);
                ticket.fail();
                self.add_message(Message::assistant(format!("Error: {}", e)))?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Replace in-memory conversations with the persisted collection
    pub fn reload(&self) -> AIResult<()> {
        let conversations = self.history.load_all();
        let mut state = self.lock()?;
        if let Some(id) = state.current_id.clone() {
            if !conversations.iter().any(|c| c.id == id) {
                state.current_id = None;
            }
        }
        state.conversations = conversations;
        Ok(())
    }

    /// Reload whenever another writer touches the conversation key
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut changes = self.config.store().subscribe();
        tokio::spawn(async move {
            loop {
                let reload = match changes.recv().await {
                    Ok(StoreChange::Key(key)) => key == KEY_CONVERSATIONS,
                    Ok(StoreChange::Cleared) => true,
                    Err(RecvError::Lagged(_)) => true,
                    Err(RecvError::Closed) => break,
                };
                if reload {
                    if let Err(e) = service.reload() {
                        log::warn!("[ai] Failed to reload conversations: {}", e);
                    }
                }
            }
        })
    }
}
