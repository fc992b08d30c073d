//! Conversation-store behavior: context windowing and summarization
//! bookkeeping.
//!
//! Token budgets here are the chars-per-token heuristic (4 by default), not
//! a real tokenizer; the assertions are written against that approximation
//! on purpose.

use colloquy::message::Role;
use colloquy::store::{Chat, StateManager, UserState};
use proptest::prelude::*;

fn chat_with_lengths(lengths: &[usize]) -> Chat {
    let mut chat = Chat::new("c1", "u1");
    for (i, len) in lengths.iter().enumerate() {
        // Distinct fill characters keep messages distinguishable.
        let fill = char::from(b'a' + (i % 26) as u8);
        chat.add_message(Role::User, fill.to_string().repeat(*len));
    }
    chat
}

#[test]
fn window_is_strict_suffix_within_budget() {
    // Budget: 3 tokens * 4 chars = 12 chars.
    let chat = chat_with_lengths(&[10, 6, 4]);
    let window = chat.context_window(3, 4);
    // Only the last two fit (6 + 4 = 10 <= 12; adding 10 would exceed).
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].content, chat.messages()[1].content);
    assert_eq!(window[1].content, chat.messages()[2].content);
}

#[test]
fn window_is_empty_when_latest_message_alone_exceeds_budget() {
    let chat = chat_with_lengths(&[2, 100]);
    assert!(chat.context_window(1, 4).is_empty());
}

#[test]
fn window_takes_everything_under_budget() {
    let chat = chat_with_lengths(&[3, 3, 3]);
    assert_eq!(chat.context_window(100, 4).len(), 3);
}

#[test]
fn messages_are_append_ordered() {
    let mut chat = Chat::new("c1", "u1");
    chat.add_message(Role::User, "first");
    chat.add_message(Role::Assistant, "second");
    chat.add_message(Role::User, "third");
    let contents: Vec<&str> = chat.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert!(chat.messages().windows(2).all(|w| w[0].when <= w[1].when));
}

#[test]
fn summarize_records_exactly_one_summary() {
    let mut user = UserState::new("u1");
    let chat_id = user.new_chat();
    // 3 tokens * 4 chars threshold = 12 chars; 20 exceeds it.
    user.chat_mut(&chat_id)
        .unwrap()
        .add_message(Role::User, "x".repeat(20));

    assert!(user.summarize_chat_if_needed(&chat_id, 3, 4));
    assert!(!user.summarize_chat_if_needed(&chat_id, 3, 4));
    assert_eq!(user.long_term().summaries.len(), 1);

    let summary = &user.long_term().summaries[&chat_id];
    assert_eq!(summary.chat_id, chat_id);
    assert_eq!(summary.message_count, 1);
    assert!(!summary.summary.is_empty());
}

#[test]
fn short_chats_are_never_summarized() {
    let mut user = UserState::new("u1");
    let chat_id = user.new_chat();
    user.chat_mut(&chat_id).unwrap().add_message(Role::User, "hi");
    assert!(!user.summarize_chat_if_needed(&chat_id, 2000, 4));
    assert!(user.long_term().summaries.is_empty());
}

#[test]
fn unknown_chat_is_not_summarized() {
    let mut user = UserState::new("u1");
    assert!(!user.summarize_chat_if_needed("nope", 1, 4));
}

#[test]
fn state_manager_isolates_users() {
    let manager = StateManager::new();
    let a = manager.user("alice");
    let b = manager.user("bob");
    assert!(!std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(manager.user_count(), 2);
}

proptest! {
    /// The window is always a suffix of the history, in order, within
    /// budget, and maximal: including one more message would exceed it.
    #[test]
    fn window_suffix_property(
        lengths in proptest::collection::vec(0usize..40, 0..20),
        max_tokens in 0usize..20,
    ) {
        let chat = chat_with_lengths(&lengths);
        let window = chat.context_window(max_tokens, 4);
        let budget = max_tokens * 4;

        let total: usize = window.iter().map(|m| m.content.chars().count()).sum();
        prop_assert!(total <= budget);

        // Suffix equality against the source history.
        let all = chat.messages();
        let suffix = &all[all.len() - window.len()..];
        let window_contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        let suffix_contents: Vec<&str> = suffix.iter().map(|m| m.content.as_str()).collect();
        prop_assert_eq!(window_contents, suffix_contents);

        // Maximality: the next-older message would not fit.
        if window.len() < all.len() {
            let next_older = &all[all.len() - window.len() - 1];
            prop_assert!(total + next_older.content.chars().count() > budget);
        }
    }
}
