use thiserror::Error;

/// Failure taxonomy for chat operations.
///
/// All three variants are caller-input or state-precondition violations,
/// raised at the point of detection and never wrapped or retried.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The referenced chat id does not exist, is deleted, or no chat
    /// matches the query filter.
    #[error("chat not found")]
    ChatNotFound,

    /// The referenced message id does not exist, is deleted, or no
    /// messages remain to satisfy the request.
    #[error("message not found")]
    MessageNotFound,

    /// The caller is not the author of the message being edited or
    /// deleted.
    #[error("access denied")]
    AccessDenied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::ChatNotFound.to_string(), "chat not found");
        assert_eq!(ChatError::MessageNotFound.to_string(), "message not found");
        assert_eq!(ChatError::AccessDenied.to_string(), "access denied");
    }
}
