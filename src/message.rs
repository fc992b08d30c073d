use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a message author within a conversation.
///
/// Serialized in lowercase (`"user"`, `"assistant"`, `"system"`), matching
/// the wire format expected by completion providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a chat thread.
///
/// Messages are immutable once created: a turn appends new messages to a
/// [`Chat`](crate::store::Chat) rather than editing prior ones. Each message
/// records its creation time and an open metadata map for auxiliary data
/// (source agent, tool provenance, and the like).
///
/// # Examples
///
/// ```
/// use colloquy::message::{Message, Role};
///
/// let msg = Message::user("What's on the reading list?");
/// assert_eq!(msg.role, Role::User);
/// assert!(msg.metadata.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Creation timestamp; also the ordering key within a chat.
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub metadata: FxHashMap<String, serde_json::Value>,
}

impl Message {
    /// Creates a message with the given role and content, stamped now.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            when: Utc::now(),
            metadata: FxHashMap::default(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Attach a metadata entry, returning the message for chaining.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
