//! Conversation store: per-user chat threads and long-term summary records.
//!
//! The store is process-lifetime state, independent of any single workflow
//! run. [`StateManager`] owns one [`UserState`] per user id; a `UserState`
//! owns that user's [`Chat`] threads and [`LongTermHistory`]. Per-request
//! workflow state lives in [`crate::state::AgentState`] instead.
//!
//! Token arithmetic throughout this module uses a characters-per-token
//! heuristic (default 4), not a real tokenizer; see [`crate::config::Config`].

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::message::{Message, Role};

/// A single conversation thread owned by one user.
///
/// Messages are append-only and ordered by append time; nothing in the
/// engine edits or removes a message once pushed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Chat {
    #[must_use]
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Appends a message to the thread and bumps `last_updated`.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.push(Message::new(role, content));
    }

    /// Appends a pre-built message (used when callers carry metadata).
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.last_updated = Utc::now();
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the longest suffix of messages whose cumulative content
    /// length stays within `max_tokens * chars_per_token` characters.
    ///
    /// Scans from the most recent message backward and stops before the
    /// first message that would exceed the budget. A message is never
    /// split: if the most recent message alone exceeds the budget, the
    /// window is empty. Original order is preserved.
    #[must_use]
    pub fn context_window(&self, max_tokens: usize, chars_per_token: usize) -> Vec<Message> {
        let budget = max_tokens.saturating_mul(chars_per_token);
        let mut total = 0usize;
        let mut start = self.messages.len();
        for (idx, message) in self.messages.iter().enumerate().rev() {
            let chars = message.content.chars().count();
            if total + chars > budget {
                break;
            }
            total += chars;
            start = idx;
        }
        self.messages[start..].to_vec()
    }

    /// True when the total content length across all messages exceeds
    /// `threshold_tokens * chars_per_token` characters.
    #[must_use]
    pub fn needs_summarization(&self, threshold_tokens: usize, chars_per_token: usize) -> bool {
        let total: usize = self
            .messages
            .iter()
            .map(|m| m.content.chars().count())
            .sum();
        total > threshold_tokens.saturating_mul(chars_per_token)
    }
}

/// Summary record for one archived chat.
///
/// Created at most once per chat; never regenerated, even if the chat keeps
/// growing past the threshold afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    pub message_count: usize,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Long-term conversational memory for one user: per-chat summaries plus
/// coarse key topics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LongTermHistory {
    pub user_id: String,
    pub summaries: FxHashMap<String, ChatSummary>,
    pub key_topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LongTermHistory {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            summaries: FxHashMap::default(),
            key_topics: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn add_summary(&mut self, summary: ChatSummary) {
        self.summaries.insert(summary.chat_id.clone(), summary);
        self.last_updated = Utc::now();
    }

    #[must_use]
    pub fn has_summary(&self, chat_id: &str) -> bool {
        self.summaries.contains_key(chat_id)
    }
}

/// All conversational state for a single user: chat threads plus the
/// long-term history they archive into.
#[derive(Clone, Debug)]
pub struct UserState {
    pub user_id: String,
    chats: FxHashMap<String, Chat>,
    long_term: LongTermHistory,
}

impl UserState {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            long_term: LongTermHistory::new(user_id.clone()),
            chats: FxHashMap::default(),
            user_id,
        }
    }

    #[must_use]
    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.get(chat_id)
    }

    #[must_use]
    pub fn chat_mut(&mut self, chat_id: &str) -> Option<&mut Chat> {
        self.chats.get_mut(chat_id)
    }

    /// Creates a fresh chat thread with a generated id and returns its id.
    pub fn new_chat(&mut self) -> String {
        let chat_id = format!("chat_{}", Uuid::new_v4());
        self.chats
            .insert(chat_id.clone(), Chat::new(chat_id.clone(), &self.user_id));
        chat_id
    }

    /// Fetches the chat under `chat_id`, creating it if absent.
    pub fn chat_or_create(&mut self, chat_id: &str) -> &mut Chat {
        self.chats
            .entry(chat_id.to_string())
            .or_insert_with(|| Chat::new(chat_id, &self.user_id))
    }

    pub fn remove_chat(&mut self, chat_id: &str) -> bool {
        self.chats.remove(chat_id).is_some()
    }

    #[must_use]
    pub fn long_term(&self) -> &LongTermHistory {
        &self.long_term
    }

    /// Archives `chat_id` into the long-term history when it has crossed the
    /// summarization threshold and has not been archived before.
    ///
    /// Returns `true` only when a new summary record was created, so calling
    /// twice without the chat changing records exactly one summary.
    pub fn summarize_chat_if_needed(
        &mut self,
        chat_id: &str,
        threshold_tokens: usize,
        chars_per_token: usize,
    ) -> bool {
        let Some(chat) = self.chats.get(chat_id) else {
            return false;
        };
        if !chat.needs_summarization(threshold_tokens, chars_per_token)
            || self.long_term.has_summary(chat_id)
        {
            return false;
        }
        let summary = ChatSummary {
            chat_id: chat_id.to_string(),
            message_count: chat.len(),
            summary: format!("Summary of chat {chat_id} with {} messages.", chat.len()),
            created_at: Utc::now(),
        };
        tracing::info!(chat_id, messages = summary.message_count, "archiving chat summary");
        self.long_term.add_summary(summary);
        true
    }
}

/// Process-wide registry of user state.
///
/// Entries are created lazily on first access and never evicted. Each user's
/// state sits behind its own async mutex: locking it for the duration of a
/// turn serializes same-user turns while leaving other users untouched,
/// which is what preserves the append-ordering invariant on chats. The outer
/// map lock is only ever held for the lookup itself, never across an await.
#[derive(Default)]
pub struct StateManager {
    users: Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<UserState>>>>,
}

impl StateManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state handle for `user_id`, creating it on first access.
    #[must_use]
    pub fn user(&self, user_id: &str) -> Arc<tokio::sync::Mutex<UserState>> {
        let mut users = self.users.lock().expect("user map lock poisoned");
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(UserState::new(user_id))))
            .clone()
    }

    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.lock().expect("user map lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_with(contents: &[&str]) -> Chat {
        let mut chat = Chat::new("c1", "u1");
        for content in contents {
            chat.add_message(Role::User, *content);
        }
        chat
    }

    #[test]
    fn context_window_takes_suffix_within_budget() {
        // Budget of 2 "tokens" at 4 chars each = 8 chars.
        let chat = chat_with(&["aaaaaa", "bbbb", "cccc"]);
        let window = chat.context_window(2, 4);
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["bbbb", "cccc"]);
    }

    #[test]
    fn context_window_never_splits_a_message() {
        let chat = chat_with(&["short", "this message is far beyond the budget"]);
        let window = chat.context_window(1, 4);
        assert!(window.is_empty());
    }

    #[test]
    fn needs_summarization_threshold() {
        let chat = chat_with(&["aaaaaaaa"]);
        assert!(chat.needs_summarization(1, 4));
        assert!(!chat.needs_summarization(2, 4));
    }

    #[test]
    fn summarize_is_idempotent_per_chat() {
        let mut user = UserState::new("u1");
        let chat_id = user.new_chat();
        user.chat_mut(&chat_id)
            .unwrap()
            .add_message(Role::User, "x".repeat(64));
        assert!(user.summarize_chat_if_needed(&chat_id, 1, 4));
        assert!(!user.summarize_chat_if_needed(&chat_id, 1, 4));
        assert_eq!(user.long_term().summaries.len(), 1);
    }

    #[test]
    fn state_manager_creates_users_lazily() {
        let manager = StateManager::new();
        assert_eq!(manager.user_count(), 0);
        let first = manager.user("u1");
        let second = manager.user("u1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.user_count(), 1);
    }
}
