//! HTTP side of a send: the `Responder` seam the pipeline talks to, and the
//! reqwest client that POSTs each question to the webhook.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;

/// The n8n test webhook the assistant was built against.
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://sandeepchittiboina.app.n8n.cloud/webhook-test/d3d366c9-533b-44ad-bbef-14c0fd630a48";

/// Body of the outbound POST. Exactly these two fields go on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookRequest {
    pub message: String,
    pub timestamp: String,
}

impl WebhookRequest {
    pub fn new(message: &str, sent_at: DateTime<Utc>) -> Self {
        Self {
            message: message.to_string(),
            // Same shape as JavaScript's toISOString: millis and a Z suffix
            timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Why a send cycle failed. The user sees the same reply for every variant;
/// the detail only reaches the log.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Connection refused, DNS failure, TLS failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    /// The webhook answered with a status outside 2xx.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The status was fine but the body could not be read.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The send task panicked or was cancelled before reporting back.
    #[error("send task aborted: {0}")]
    Aborted(String),
}

/// Something that turns a request into reply text.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &WebhookRequest) -> Result<String, SendError>;
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    /// Build a client for `url`. With `timeout` unset, a hung request waits as
    /// long as the network layer lets it.
    pub fn new(url: &str, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Responder for WebhookClient {
    async fn respond(&self, request: &WebhookRequest) -> Result<String, SendError> {
        tracing::debug!(url = %self.url, bytes = request.message.len(), "posting to webhook");

        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Http {
                status: status.as_u16(),
            });
        }

        // Body is plain text whatever the declared content type
        response
            .text()
            .await
            .map_err(|e| SendError::MalformedResponse(e.to_string()))
    }
}
