//! Conversation store
//!
//! Owns the append-only message log and the in-flight flag for one session.
//! Every append bumps a revision on a watch channel so the UI can react
//! (scroll to the newest message) without the store knowing about the UI.

use tokio::sync::watch;

use crate::message::{Message, GREETING};

pub struct ConversationStore {
    messages: Vec<Message>,
    is_loading: bool,
    next_id: u64,
    changes: watch::Sender<u64>,
}

impl ConversationStore {
    /// Create a store seeded with the assistant greeting.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        let mut store = Self {
            messages: Vec::new(),
            is_loading: false,
            next_id: 1,
            changes,
        };
        let id = store.next_id();
        store.messages.push(Message::assistant(id, GREETING));
        store
    }

    /// Issue a fresh message id. Ids count up from "1" and never repeat.
    pub fn next_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.changes.send_modify(|revision| *revision += 1);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Observe appends. The value is a revision counter, only its changes matter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatRole;

    #[test]
    fn test_new_store_has_single_greeting() {
        let store = ConversationStore::new();
        assert_eq!(store.len(), 1);
        let greeting = &store.messages()[0];
        assert_eq!(greeting.role, ChatRole::Assistant);
        assert_eq!(greeting.text, GREETING);
        assert_eq!(greeting.id, "1");
        assert!(!store.is_loading());
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut store = ConversationStore::new();
        let a = store.next_id();
        let b = store.next_id();
        assert_eq!(a, "2");
        assert_eq!(b, "3");
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = ConversationStore::new();
        let id = store.next_id();
        store.append(Message::user(id, "first"));
        let id = store.next_id();
        store.append(Message::assistant(id, "second"));

        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![GREETING, "first", "second"]);
        assert_eq!(store.last().map(|m| m.text.as_str()), Some("second"));
    }

    #[test]
    fn test_append_notifies_subscribers() {
        let mut store = ConversationStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        let id = store.next_id();
        store.append(Message::user(id, "hi"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_set_loading_does_not_notify() {
        let mut store = ConversationStore::new();
        let rx = store.subscribe();
        store.set_loading(true);
        assert!(store.is_loading());
        assert!(!rx.has_changed().unwrap());
    }
}
