//! In-memory chat storage and invariant enforcement.
//!
//! `ChatStore` owns the ordered chat collection plus both global id
//! sequences. Every operation is a plain synchronous method; locking is
//! the service layer's job.

use parley_types::chat::{Chat, ChatId, ChatPreview, Message, MessageId, UserId};
use parley_types::error::ChatError;

/// Owns all chats and allocates both global id sequences.
///
/// Message ids form one dense monotonic sequence shared across every chat;
/// chat ids are a second, independent sequence. Both start at 1, whether
/// the chat was created explicitly or as a side effect of a send.
#[derive(Debug, Default)]
pub(crate) struct ChatStore {
    chats: Vec<Chat>,
    last_chat_id: u64,
    last_message_id: u64,
}

impl ChatStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Id allocation
    // -----------------------------------------------------------------------

    fn alloc_chat_id(&mut self) -> ChatId {
        self.last_chat_id += 1;
        ChatId(self.last_chat_id)
    }

    fn alloc_message_id(&mut self) -> MessageId {
        self.last_message_id += 1;
        MessageId(self.last_message_id)
    }

    // -----------------------------------------------------------------------
    // Lookup helpers
    // -----------------------------------------------------------------------

    /// Non-deleted chat by id. Absent and deleted are the same failure.
    fn live_chat_mut(&mut self, chat_id: ChatId) -> Result<&mut Chat, ChatError> {
        match self.chats.iter_mut().find(|c| c.id == chat_id) {
            Some(chat) if !chat.deleted => Ok(chat),
            _ => Err(ChatError::ChatNotFound),
        }
    }

    /// Position of the chat and slot holding `message_id`, regardless of
    /// deletion state. Ids are unique, so the first hit is the only one.
    fn locate_message(&self, message_id: MessageId) -> Option<(usize, usize)> {
        self.chats.iter().enumerate().find_map(|(ci, chat)| {
            chat.messages
                .iter()
                .position(|m| m.id == message_id)
                .map(|mi| (ci, mi))
        })
    }

    /// Resolve a message for edit/delete. The author check applies only
    /// to live messages and wins over not-found for them; a deleted
    /// message reports not-found no matter who asks.
    fn find_authored_message(
        &self,
        user_id: UserId,
        message_id: MessageId,
    ) -> Result<(usize, usize), ChatError> {
        let (ci, mi) = self
            .locate_message(message_id)
            .ok_or(ChatError::MessageNotFound)?;
        let message = &self.chats[ci].messages[mi];
        if message.deleted {
            return Err(ChatError::MessageNotFound);
        }
        if message.author_id != user_id {
            return Err(ChatError::AccessDenied);
        }
        Ok((ci, mi))
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Append a message, creating the target chat when `chat_id` is `None`
    /// or matches no existing chat. A fresh chat takes the message's
    /// timestamp as its own.
    ///
    /// Returns the new message id and the chat that received it.
    pub(crate) fn send_message(
        &mut self,
        author_id: UserId,
        chat_id: Option<ChatId>,
        text: String,
        created_at: i64,
    ) -> Result<(MessageId, ChatId), ChatError> {
        let existing = match chat_id {
            Some(id) => match self.chats.iter().position(|c| c.id == id) {
                Some(index) if self.chats[index].deleted => {
                    return Err(ChatError::ChatNotFound);
                }
                Some(index) => Some(index),
                // An id matching nothing opens a fresh chat below; the
                // requested id is never reused.
                None => None,
            },
            None => None,
        };

        let index = match existing {
            Some(index) => index,
            None => {
                let id = self.alloc_chat_id();
                self.chats.push(Chat::new(id, created_at));
                self.chats.len() - 1
            }
        };

        let message_id = self.alloc_message_id();
        let chat = &mut self.chats[index];
        chat.messages
            .push(Message::new(message_id, author_id, text, created_at));
        Ok((message_id, chat.id))
    }

    /// Replace the text of a live message authored by `user_id`.
    pub(crate) fn edit_message(
        &mut self,
        user_id: UserId,
        message_id: MessageId,
        text: String,
    ) -> Result<(), ChatError> {
        let (ci, mi) = self.find_authored_message(user_id, message_id)?;
        self.chats[ci].messages[mi].replace_text(text);
        Ok(())
    }

    /// Soft-delete a live message authored by `user_id`. When the last
    /// surviving message of a chat goes, the chat goes with it.
    ///
    /// Returns the owning chat's id and whether the cascade fired.
    pub(crate) fn delete_message(
        &mut self,
        user_id: UserId,
        message_id: MessageId,
    ) -> Result<(ChatId, bool), ChatError> {
        let (ci, mi) = self.find_authored_message(user_id, message_id)?;
        let chat = &mut self.chats[ci];
        chat.messages[mi].mark_deleted();
        if chat.all_messages_deleted() {
            chat.mark_deleted();
        }
        Ok((chat.id, chat.deleted))
    }

    /// All non-deleted messages of a live chat, in creation order, marked
    /// read as a side effect.
    pub(crate) fn get_all_messages(
        &mut self,
        chat_id: ChatId,
    ) -> Result<Vec<Message>, ChatError> {
        let chat = self.live_chat_mut(chat_id)?;
        if chat.last_visible_message().is_none() {
            return Err(ChatError::MessageNotFound);
        }

        let mut result = Vec::new();
        for message in chat.messages.iter_mut().filter(|m| m.is_visible()) {
            message.mark_read();
            result.push(message.clone());
        }
        Ok(result)
    }

    /// Up to `count` non-deleted messages starting at and including
    /// `start_message_id`, in creation order, marked read as a side
    /// effect. A short tail is not an error; an empty window is.
    pub(crate) fn get_message_window(
        &mut self,
        chat_id: ChatId,
        start_message_id: MessageId,
        count: usize,
    ) -> Result<Vec<Message>, ChatError> {
        let chat = self.live_chat_mut(chat_id)?;
        // The start id must name a visible message; never-existed and
        // deleted are the same failure.
        if !chat.visible_messages().any(|m| m.id == start_message_id) {
            return Err(ChatError::MessageNotFound);
        }

        let mut window = Vec::new();
        for message in chat
            .messages
            .iter_mut()
            .filter(|m| m.is_visible())
            .skip_while(|m| m.id != start_message_id)
            .take(count)
        {
            message.mark_read();
            window.push(message.clone());
        }
        if window.is_empty() {
            return Err(ChatError::MessageNotFound);
        }
        Ok(window)
    }

    /// Create an empty live chat and return its id.
    pub(crate) fn create_chat(&mut self, created_at: i64) -> ChatId {
        let id = self.alloc_chat_id();
        self.chats.push(Chat::new(id, created_at));
        id
    }

    /// Every non-deleted chat where `user_id` has a non-deleted message,
    /// each paired with its latest non-deleted message (any author), in
    /// chat creation order.
    pub(crate) fn chats_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ChatPreview>, ChatError> {
        let previews: Vec<ChatPreview> = self
            .chats
            .iter()
            .filter(|chat| !chat.deleted && chat.has_visible_message_from(user_id))
            .filter_map(|chat| {
                chat.last_visible_message().map(|last| ChatPreview {
                    chat: chat.clone(),
                    last_message: last.clone(),
                })
            })
            .collect();

        if previews.is_empty() {
            return Err(ChatError::ChatNotFound);
        }
        Ok(previews)
    }

    /// Number of non-deleted chats where `user_id` has a non-deleted
    /// message and some other author has a non-deleted message still
    /// unread.
    pub(crate) fn unread_chats_count(&self, user_id: UserId) -> usize {
        self.chats
            .iter()
            .filter(|chat| !chat.deleted)
            .filter(|chat| chat.has_visible_message_from(user_id))
            .filter(|chat| {
                chat.visible_messages()
                    .any(|m| m.author_id != user_id && m.unread)
            })
            .count()
    }

    /// Soft-delete a live chat along with every message in it, deleted
    /// or not.
    pub(crate) fn delete_chat(&mut self, chat_id: ChatId) -> Result<(), ChatError> {
        let chat = self.live_chat_mut(chat_id)?;
        chat.mark_deleted();
        for message in &mut chat.messages {
            message.mark_deleted();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test introspection
// ---------------------------------------------------------------------------

#[cfg(test)]
impl ChatStore {
    /// Drop all chats and restart both id sequences at 1.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Clone of the full chat list, deleted entries included.
    pub(crate) fn chats(&self) -> Vec<Chat> {
        self.chats.clone()
    }

    /// Id of the most recently created chat, if any.
    pub(crate) fn last_chat_id(&self) -> Option<ChatId> {
        self.chats.last().map(|c| c.id)
    }

    /// The chat's deleted flag; unlike the read operations, deleted chats
    /// are still visible here.
    pub(crate) fn chat_status(&self, chat_id: ChatId) -> Result<bool, ChatError> {
        self.chats
            .iter()
            .find(|c| c.id == chat_id)
            .map(|c| c.deleted)
            .ok_or(ChatError::ChatNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: UserId = UserId(999);
    const BOB: UserId = UserId(111);

    const T0: i64 = 1_649_311_450;

    fn send(store: &mut ChatStore, author: UserId, chat: Option<ChatId>) -> MessageId {
        let (id, _) = store
            .send_message(author, chat, "hello".to_string(), T0)
            .unwrap();
        id
    }

    #[test]
    fn id_sequences_are_independent() {
        let mut store = ChatStore::new();
        let chat = store.create_chat(T0);
        assert_eq!(chat, ChatId(1));

        let (msg, target) = store
            .send_message(ALICE, Some(chat), "hi".to_string(), T0)
            .unwrap();
        assert_eq!(msg, MessageId(1));
        assert_eq!(target, chat);

        // A chat-less send opens chat 2 but continues the message sequence.
        let (msg, target) = store
            .send_message(ALICE, None, "hi again".to_string(), T0 + 10)
            .unwrap();
        assert_eq!(msg, MessageId(2));
        assert_eq!(target, ChatId(2));
    }

    #[test]
    fn implicit_chat_takes_message_timestamp() {
        let mut store = ChatStore::new();
        send(&mut store, ALICE, None);
        assert_eq!(store.chats()[0].created_at, T0);
    }

    #[test]
    fn send_to_unknown_chat_id_never_reuses_requested_id() {
        let mut store = ChatStore::new();
        send(&mut store, ALICE, None);
        let (_, target) = store
            .send_message(ALICE, Some(ChatId(7)), "stray".to_string(), T0)
            .unwrap();
        assert_eq!(target, ChatId(2));
        assert_eq!(store.last_chat_id(), Some(ChatId(2)));
    }

    #[test]
    fn send_to_deleted_chat_is_rejected() {
        let mut store = ChatStore::new();
        let msg = send(&mut store, ALICE, None);
        store.delete_message(ALICE, msg).unwrap();

        let result = store.send_message(ALICE, Some(ChatId(1)), "late".to_string(), T0);
        assert!(matches!(result, Err(ChatError::ChatNotFound)));
    }

    #[test]
    fn cascade_counts_previously_deleted_messages() {
        let mut store = ChatStore::new();
        let m1 = send(&mut store, ALICE, None);
        let m2 = send(&mut store, BOB, Some(ChatId(1)));

        let (_, cascaded) = store.delete_message(ALICE, m1).unwrap();
        assert!(!cascaded);
        assert!(!store.chat_status(ChatId(1)).unwrap());

        // The second delete finds m1 already gone and takes the chat down.
        let (_, cascaded) = store.delete_message(BOB, m2).unwrap();
        assert!(cascaded);
        assert!(store.chat_status(ChatId(1)).unwrap());
    }

    #[test]
    fn delete_chat_rejects_already_deleted() {
        let mut store = ChatStore::new();
        send(&mut store, ALICE, None);
        store.delete_chat(ChatId(1)).unwrap();
        assert!(matches!(
            store.delete_chat(ChatId(1)),
            Err(ChatError::ChatNotFound)
        ));
    }

    #[test]
    fn reset_restarts_both_sequences() {
        let mut store = ChatStore::new();
        send(&mut store, ALICE, None);
        send(&mut store, ALICE, None);
        store.reset();
        assert!(store.chats().is_empty());

        let (msg, chat) = store
            .send_message(ALICE, None, "fresh".to_string(), T0)
            .unwrap();
        assert_eq!(msg, MessageId(1));
        assert_eq!(chat, ChatId(1));
    }
}
