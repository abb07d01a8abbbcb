// Conversation Repository
// The conversation list is stored as one plaintext JSON array

use crate::models::Conversation;
use crate::utils::store::{SharedStore, StoreResult, KEY_CONVERSATIONS};

/// Repository for the persisted conversation collection
#[derive(Clone)]
pub struct ConversationRepository {
    store: SharedStore,
}

impl ConversationRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load every conversation, newest first as stored
    ///
    /// Unreadable data is logged and treated as an empty history.
    pub fn load_all(&self) -> Vec<Conversation> {
        let raw = match self.store.read(KEY_CONVERSATIONS) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::error!("[conversations] Failed to read history: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::error!("[conversations] Failed to parse history: {}", e);
            Vec::new()
        })
    }

    /// Replace the whole collection
    pub fn save_all(&self, conversations: &[Conversation]) -> StoreResult<()> {
        let json = serde_json::to_string(conversations)
            .map_err(|e| crate::utils::store::StoreError::Corrupted(e.to_string()))?;
        self.store.write(KEY_CONVERSATIONS, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::utils::store::MemoryStore;

    #[test]
    fn test_save_and_load() {
        let repo = ConversationRepository::new(MemoryStore::shared());
        let mut conv = Conversation::with_title("hello");
        conv.messages.push(Message::user("hello there"));

        repo.save_all(&[conv.clone()]).unwrap();
        assert_eq!(repo.load_all(), vec![conv]);
    }

    #[test]
    fn test_corrupted_history_loads_empty() {
        let store = MemoryStore::shared();
        store.write(KEY_CONVERSATIONS, "{broken").unwrap();
        let repo = ConversationRepository::new(store);
        assert!(repo.load_all().is_empty());
    }
}
