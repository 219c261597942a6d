//! Conversation transcript data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Single entry in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        write!(f, "{}: {}", prefix, self.content)
    }
}

/// Ordered conversation transcript.
///
/// Append-only except for the last element, which the coordinator rewrites in
/// place while a generation session is streaming into it. At most one such
/// in-progress message exists at a time, and only while the busy flag is set.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, returning its index.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Overwrite the content of the message at `index` with the full
    /// accumulated text so far. Used only for the in-progress slot.
    pub fn set_content(&mut self, index: usize, content: String) {
        match self.messages.get_mut(index) {
            Some(message) => message.content = content,
            None => tracing::warn!(index, "transcript slot out of range, delta dropped"),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Full copy of the transcript for publication to observers.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(Message::user("hi").to_string(), "You: hi");
        assert_eq!(Message::assistant("hey").to_string(), "Assistant: hey");
        assert_eq!(Message::system("oops").to_string(), "System: oops");
    }

    #[test]
    fn test_push_and_overwrite_last() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("hi"));
        let slot = transcript.push(Message::assistant(""));

        transcript.set_content(slot, "Hello".to_string());
        transcript.set_content(slot, "Hello there".to_string());

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[slot].content, "Hello there");
        assert_eq!(transcript.messages()[0].content, "hi");
    }

    #[test]
    fn test_out_of_range_content_is_ignored() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("hi"));
        transcript.set_content(5, "ignored".to_string());
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.messages()[0].content, "hi");
    }

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let json = serde_json::to_string(&Message::assistant("hey")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hey"}"#);
        let message: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, Message::assistant("hey"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut transcript = Transcript::new();
        let slot = transcript.push(Message::assistant(""));
        let snapshot = transcript.snapshot();
        transcript.set_content(slot, "changed".to_string());
        assert_eq!(snapshot[slot].content, "");
    }
}
