//! Chat, message, and identifier types for Parley.
//!
//! These types model an in-memory chat domain: chats, the messages they
//! contain, and the read/soft-delete state both carry. Field updates go
//! through the named transition methods here; deciding *when* a transition
//! happens is the service layer's job.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Unique identifier for a chat.
///
/// Allocated by the store as a dense monotonic sequence starting at 1,
/// independent of the message id sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChatId(pub u64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Unique identifier for a message.
///
/// Message ids form one dense monotonic sequence shared across every chat
/// in the system, starting at 1. Comparing two ids therefore also compares
/// creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Identifier of a user, supplied by the caller and trusted as-is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// A single authored text entry within exactly one chat.
///
/// Messages start unread and live. A read operation clears `unread`; a
/// soft delete sets `deleted`. Once deleted, a message never comes back
/// and no edit or read operation touches it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: UserId,
    pub text: String,
    /// Caller-supplied timestamp, opaque to the service.
    pub created_at: i64,
    pub unread: bool,
    pub deleted: bool,
}

impl Message {
    /// Create a live, unread message.
    pub fn new(id: MessageId, author_id: UserId, text: String, created_at: i64) -> Self {
        Self {
            id,
            author_id,
            text,
            created_at,
            unread: true,
            deleted: false,
        }
    }

    /// Whether read and edit operations may see this message.
    pub fn is_visible(&self) -> bool {
        !self.deleted
    }

    /// Clear the unread flag. Called when a read operation returns the
    /// message to any caller.
    pub fn mark_read(&mut self) {
        self.unread = false;
    }

    /// Soft-delete the message. The flag is never un-set.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Replace the text in place; every other field keeps its value.
    pub fn replace_text(&mut self, text: String) {
        self.text = text;
    }
}

/// A container of an ordered sequence of messages.
///
/// `messages` is insertion-ordered, which equals creation order since
/// message ids are assigned monotonically. A non-deleted chat may hold a
/// mix of deleted and non-deleted messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub messages: Vec<Message>,
    /// The first message's timestamp, or the explicit creation time for
    /// chats created empty.
    pub created_at: i64,
    pub deleted: bool,
}

impl Chat {
    /// Create an empty live chat.
    pub fn new(id: ChatId, created_at: i64) -> Self {
        Self {
            id,
            messages: Vec::new(),
            created_at,
            deleted: false,
        }
    }

    /// Soft-delete the chat. The flag is never un-set.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Iterate the non-deleted messages in creation order.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_visible())
    }

    /// The latest non-deleted message, if any.
    pub fn last_visible_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_visible())
    }

    /// Whether `user_id` authored at least one non-deleted message here.
    pub fn has_visible_message_from(&self, user_id: UserId) -> bool {
        self.visible_messages().any(|m| m.author_id == user_id)
    }

    /// Whether every message in the chat has been deleted. Drives the
    /// delete cascade; counts messages deleted by earlier calls too.
    pub fn all_messages_deleted(&self) -> bool {
        self.messages.iter().all(|m| m.deleted)
    }
}

/// A chat paired with its latest non-deleted message, as returned by
/// `ChatService::chats_for_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPreview {
    pub chat: Chat,
    pub last_message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u64, author: u64) -> Message {
        Message::new(
            MessageId(id),
            UserId(author),
            format!("message {id}"),
            1_649_311_450,
        )
    }

    #[test]
    fn new_message_starts_unread_and_live() {
        let m = message(1, 999);
        assert!(m.unread);
        assert!(!m.deleted);
        assert!(m.is_visible());
    }

    #[test]
    fn mark_read_and_mark_deleted_are_one_way() {
        let mut m = message(1, 999);
        m.mark_read();
        assert!(!m.unread);
        m.mark_deleted();
        assert!(m.deleted);
        assert!(!m.is_visible());
    }

    #[test]
    fn replace_text_keeps_identity_fields() {
        let mut m = message(7, 999);
        m.replace_text("edited".to_string());
        assert_eq!(m.text, "edited");
        assert_eq!(m.id, MessageId(7));
        assert_eq!(m.author_id, UserId(999));
        assert_eq!(m.created_at, 1_649_311_450);
    }

    #[test]
    fn visible_messages_skips_deleted() {
        let mut chat = Chat::new(ChatId(1), 0);
        chat.messages.push(message(1, 999));
        chat.messages.push(message(2, 111));
        chat.messages.push(message(3, 999));
        chat.messages[1].mark_deleted();

        let visible: Vec<MessageId> = chat.visible_messages().map(|m| m.id).collect();
        assert_eq!(visible, vec![MessageId(1), MessageId(3)]);
    }

    #[test]
    fn last_visible_message_skips_deleted_tail() {
        let mut chat = Chat::new(ChatId(1), 0);
        chat.messages.push(message(1, 999));
        chat.messages.push(message(2, 999));
        chat.messages[1].mark_deleted();

        assert_eq!(chat.last_visible_message().map(|m| m.id), Some(MessageId(1)));
    }

    #[test]
    fn all_messages_deleted_counts_every_message() {
        let mut chat = Chat::new(ChatId(1), 0);
        chat.messages.push(message(1, 999));
        chat.messages.push(message(2, 111));
        chat.messages[0].mark_deleted();
        assert!(!chat.all_messages_deleted());
        chat.messages[1].mark_deleted();
        assert!(chat.all_messages_deleted());
    }

    #[test]
    fn ids_display_and_parse() {
        let id: ChatId = "42".parse().unwrap();
        assert_eq!(id, ChatId(42));
        assert_eq!(id.to_string(), "42");

        let id: MessageId = "7".parse().unwrap();
        assert_eq!(id.to_string(), "7");

        assert!("not a number".parse::<UserId>().is_err());
    }

    #[test]
    fn message_id_order_matches_creation_order() {
        assert!(MessageId(1) < MessageId(2));
    }

    #[test]
    fn message_serde_shape() {
        let m = message(1, 999);
        let json = serde_json::to_string(&m).unwrap();
        // Id newtypes serialize as bare integers.
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"author_id\":999"));
        assert!(json.contains("\"unread\":true"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn chat_serde_roundtrip() {
        let mut chat = Chat::new(ChatId(3), 1_649_311_450);
        chat.messages.push(message(1, 999));
        let json = serde_json::to_string(&chat).unwrap();
        let back: Chat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chat);
    }
}
