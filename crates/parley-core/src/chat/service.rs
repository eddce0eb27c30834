//! The public chat service.
//!
//! `ChatService` is the sole reader and mutator of chat state. Every
//! operation takes a single exclusive lock for its full duration, so a
//! caller never observes a half-applied update (a message marked read
//! without its siblings, a delete without its cascade). Cloning the
//! service produces another handle to the same state.

use std::sync::{Arc, Mutex, MutexGuard};

use parley_types::chat::{ChatId, ChatPreview, Message, MessageId, UserId};
use parley_types::error::ChatError;
use tracing::info;

use crate::chat::store::ChatStore;

#[cfg(test)]
use parley_types::chat::Chat;

/// In-memory chat service owning every chat and message in the system.
///
/// Operations are synchronous and run to completion under the lock; no
/// operation suspends or blocks on I/O. Failures are detected by lookup
/// before any mutation is applied.
#[derive(Debug, Clone)]
pub struct ChatService {
    store: Arc<Mutex<ChatStore>>,
}

impl ChatService {
    /// Create a service with no chats. Both id sequences start at 1.
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(ChatStore::new())),
        }
    }

    fn store(&self) -> MutexGuard<'_, ChatStore> {
        self.store.lock().expect("chat store lock poisoned")
    }

    /// Send a message and return its id, freshly drawn from the global
    /// message sequence.
    ///
    /// With `chat_id` of `None`, or an id matching no existing chat, the
    /// message opens a new chat (next chat id) and becomes its first
    /// entry. Sending to a deleted chat fails with `ChatNotFound`.
    pub fn send_message(
        &self,
        author_id: UserId,
        chat_id: Option<ChatId>,
        text: String,
        created_at: i64,
    ) -> Result<MessageId, ChatError> {
        let (message_id, target) =
            self.store()
                .send_message(author_id, chat_id, text, created_at)?;
        info!(
            message_id = %message_id,
            chat_id = %target,
            author_id = %author_id,
            "message sent"
        );
        Ok(message_id)
    }

    /// Replace the text of a message authored by `user_id`.
    ///
    /// Fails with `AccessDenied` when the live message belongs to someone
    /// else, and with `MessageNotFound` when no such message exists or it
    /// has been deleted.
    pub fn edit_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
        text: String,
    ) -> Result<(), ChatError> {
        self.store().edit_message(user_id, message_id, text)?;
        info!(message_id = %message_id, author_id = %user_id, "message edited");
        Ok(())
    }

    /// Soft-delete a message authored by `user_id`.
    ///
    /// Same lookup and authorization rules as `edit_message`. When the
    /// last surviving message of a chat is deleted, the chat is deleted
    /// with it.
    pub fn delete_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
    ) -> Result<(), ChatError> {
        let (chat_id, chat_deleted) = self.store().delete_message(user_id, message_id)?;
        info!(
            message_id = %message_id,
            chat_id = %chat_id,
            chat_deleted,
            "message deleted"
        );
        Ok(())
    }

    /// All non-deleted messages of a chat, in creation order.
    ///
    /// Marks every returned message read. Fails with `ChatNotFound` for
    /// an absent or deleted chat, and with `MessageNotFound` when no
    /// non-deleted messages remain.
    pub fn get_all_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, ChatError> {
        self.store().get_all_messages(chat_id)
    }

    /// Up to `count` non-deleted messages starting at and including
    /// `start_message_id`, in creation order.
    ///
    /// Marks the returned messages read. The start id must name a
    /// non-deleted message of the chat; a window shorter than `count` is
    /// returned as-is, an empty one fails with `MessageNotFound`.
    pub fn get_message_window(
        &self,
        chat_id: ChatId,
        start_message_id: MessageId,
        count: usize,
    ) -> Result<Vec<Message>, ChatError> {
        self.store()
            .get_message_window(chat_id, start_message_id, count)
    }

    /// Create an empty chat with the given creation timestamp and return
    /// its id.
    pub fn create_chat(&self, created_at: i64) -> ChatId {
        let chat_id = self.store().create_chat(created_at);
        info!(chat_id = %chat_id, "chat created");
        chat_id
    }

    /// Every non-deleted chat where the user has a non-deleted message,
    /// paired with the chat's latest non-deleted message (any author).
    ///
    /// Fails with `ChatNotFound` when no chat qualifies.
    pub fn chats_for_user(&self, user_id: UserId) -> Result<Vec<ChatPreview>, ChatError> {
        self.store().chats_for_user(user_id)
    }

    /// Number of non-deleted chats where the user participates and some
    /// other author still has an unread, non-deleted message.
    pub fn unread_chats_count(&self, user_id: UserId) -> usize {
        self.store().unread_chats_count(user_id)
    }

    /// Soft-delete a chat and every message in it, deleted or not.
    ///
    /// Fails with `ChatNotFound` for an absent or already-deleted chat.
    pub fn delete_chat(&self, chat_id: ChatId) -> Result<(), ChatError> {
        self.store().delete_chat(chat_id)?;
        info!(chat_id = %chat_id, "chat deleted");
        Ok(())
    }
}

impl Default for ChatService {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Test introspection
// ---------------------------------------------------------------------------

#[cfg(test)]
impl ChatService {
    /// Drop all chats and restart both id sequences.
    fn reset(&self) {
        self.store().reset();
    }

    /// Clone of the full chat list, deleted entries included.
    fn chats(&self) -> Vec<Chat> {
        self.store().chats()
    }

    /// Id of the most recently created chat, if any.
    fn last_chat_id(&self) -> Option<ChatId> {
        self.store().last_chat_id()
    }

    /// The chat's deleted flag, visible even for deleted chats.
    fn chat_status(&self, chat_id: ChatId) -> Result<bool, ChatError> {
        self.store().chat_status(chat_id)
    }
}
