//! Send pipeline
//!
//! One call to [`SendPipeline::send_message`] is one cycle:
//! `Idle -> Sending -> {Delivered | Failed} -> Idle`.
//!
//! The cycle is split in two so an event loop can keep drawing while the
//! request is out: [`SendPipeline::start`] records the user message, raises the
//! loading flag and spawns the request; [`SendPipeline::finish`] reconciles
//! whatever the task produced and always lowers the flag last.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::message::{Message, Notification, CONNECTION_ERROR_REPLY, EMPTY_REPLY_FALLBACK};
use crate::store::ConversationStore;
use crate::webhook::{Responder, SendError, WebhookRequest};

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Reply text as appended to the store (fallback already substituted).
    Delivered(String),
    Failed(SendError),
}

/// A request in flight
pub struct SendTask {
    handle: JoinHandle<Result<String, SendError>>,
}

impl SendTask {
    /// Wait for the request to resolve. Safe to drop and call again: the
    /// underlying task keeps running either way.
    pub async fn wait(&mut self) -> Result<String, SendError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(SendError::Aborted(e.to_string())),
        }
    }
}

pub struct SendPipeline {
    responder: Arc<dyn Responder>,
    notifier: mpsc::UnboundedSender<Notification>,
}

impl SendPipeline {
    pub fn new(responder: Arc<dyn Responder>, notifier: mpsc::UnboundedSender<Notification>) -> Self {
        Self { responder, notifier }
    }

    /// Append the user's message, mark the store loading and fire the request.
    ///
    /// Callers must not start a cycle while `store.is_loading()`; blank input
    /// should be filtered before this point.
    pub fn start(&self, store: &mut ConversationStore, text: &str) -> SendTask {
        debug_assert!(!store.is_loading(), "send started while another is in flight");

        let id = store.next_id();
        let user_message = Message::user(id, text);
        let request = WebhookRequest::new(text, user_message.timestamp);

        tracing::info!(id = %user_message.id, chars = text.chars().count(), "sending message");
        store.append(user_message);
        store.set_loading(true);

        let responder = Arc::clone(&self.responder);
        let handle = tokio::spawn(async move { responder.respond(&request).await });

        SendTask { handle }
    }

    /// Turn the request result into an assistant message and close the cycle.
    pub fn finish(
        &self,
        store: &mut ConversationStore,
        result: Result<String, SendError>,
    ) -> SendOutcome {
        let id = store.next_id();

        let outcome = match result {
            Ok(body) => {
                let text = if body.is_empty() {
                    tracing::info!("webhook returned an empty body");
                    EMPTY_REPLY_FALLBACK.to_string()
                } else {
                    body
                };
                store.append(Message::assistant(id, text.clone()));
                SendOutcome::Delivered(text)
            }
            Err(err) => {
                tracing::warn!(error = %err, "send failed");
                store.append(Message::assistant(id, CONNECTION_ERROR_REPLY));
                // Receiver gone means nobody is showing toasts anymore
                let _ = self.notifier.send(Notification::connection_error());
                SendOutcome::Failed(err)
            }
        };

        store.set_loading(false);
        outcome
    }

    /// Run a whole cycle and wait for it to settle.
    pub async fn send_message(&self, store: &mut ConversationStore, text: &str) -> SendOutcome {
        let mut task = self.start(store, text);
        let result = task.wait().await;
        self.finish(store, result)
    }
}
