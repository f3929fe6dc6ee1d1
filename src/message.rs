//! Chat message types
//!
//! These are plain data shared by the store, the send pipeline and the
//! terminal UI. Nothing here depends on ratatui or on the network layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opening line the assistant shows before the user has typed anything.
pub const GREETING: &str =
    "Hello! I'm your weather assistant. Ask me about weather in any city or location!";

/// Substituted when the webhook answers 2xx with an empty body.
pub const EMPTY_REPLY_FALLBACK: &str =
    "I received your message but didn't get a response. Please try again!";

/// Shown for every failed send, whatever the underlying cause.
pub const CONNECTION_ERROR_REPLY: &str =
    "Sorry, I'm having trouble connecting right now. Please check your internet connection and try again.";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(id: String, text: impl Into<String>) -> Self {
        Self::new(id, text, ChatRole::User)
    }

    pub fn assistant(id: String, text: impl Into<String>) -> Self {
        Self::new(id, text, ChatRole::Assistant)
    }

    fn new(id: String, text: impl Into<String>, role: ChatRole) -> Self {
        Self {
            id,
            text: text.into(),
            role,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// Transient, dismissible alert raised when a send fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn connection_error() -> Self {
        Self {
            title: "Connection Error".to_string(),
            description: "Unable to connect to weather service. Please try again.".to_string(),
        }
    }
}
