//! Test doubles for the webhook

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::webhook::{Responder, SendError, WebhookRequest};

/// Responder that plays back queued replies and records what it was sent.
pub struct MockResponder {
    replies: Mutex<VecDeque<Result<String, SendError>>>,
    requests: Mutex<Vec<WebhookRequest>>,
    gate: Option<Notify>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Like `new`, but every reply is held until `release` is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new()
        }
    }

    pub fn queue_reply(&self, body: &str) {
        self.replies.lock().unwrap().push_back(Ok(body.to_string()));
    }

    pub fn queue_error(&self, error: SendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn recorded_requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, request: &WebhookRequest) -> Result<String, SendError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SendError::Transport("no mock reply queued".to_string())))
    }
}

/// Responder whose task dies mid-request.
pub struct PanickingResponder;

#[async_trait]
impl Responder for PanickingResponder {
    async fn respond(&self, _request: &WebhookRequest) -> Result<String, SendError> {
        panic!("responder blew up");
    }
}
