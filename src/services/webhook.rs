use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, StatusCode};

use crate::config::FlowConfig;
use crate::models::session::JobSubmission;

/// The remote job service as seen by this client: one fire-and-forget
/// submission endpoint and one status endpoint. The production
/// implementation talks to the Make.com webhooks; tests script this trait.
#[async_trait]
pub trait JobEndpoint: Send + Sync {
    /// Send the one-shot multipart submission. 2xx means accepted.
    async fn submit(&self, submission: &JobSubmission) -> Result<(), EndpointError>;

    /// Fetch the raw status body for a session. The body is near-JSON and
    /// must go through the normalizer before interpretation.
    async fn fetch_status(&self, session_id: &str) -> Result<String, EndpointError>;
}

/// Client for the two Make.com webhooks backing the flow.
pub struct MakeWebhookClient {
    http: Client,
    webhook_url: String,
    poll_url: String,
}

impl MakeWebhookClient {
    pub fn new(config: &FlowConfig) -> Self {
        Self {
            http: Client::new(),
            webhook_url: config.webhook_url.clone(),
            poll_url: config.poll_url.clone(),
        }
    }
}

#[async_trait]
impl JobEndpoint for MakeWebhookClient {
    async fn submit(&self, submission: &JobSubmission) -> Result<(), EndpointError> {
        let form = multipart::Form::new()
            .text("sessionId", submission.session_id.clone())
            .text("nombre", submission.nombre.clone())
            .text("estado", submission.estado.clone())
            .text("telefono", submission.telefono.clone())
            .text("q1", submission.q1.clone())
            .text("q2", submission.q2.clone())
            .part(
                "photo",
                multipart::Part::bytes(submission.photo_bytes.clone())
                    .file_name("selfie.png")
                    .mime_str("image/png")
                    .map_err(EndpointError::Http)?,
            );

        let response = self
            .http
            .post(&self.webhook_url)
            .multipart(form)
            .send()
            .await
            .map_err(EndpointError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Status(status));
        }

        Ok(())
    }

    async fn fetch_status(&self, session_id: &str) -> Result<String, EndpointError> {
        let response = self
            .http
            .get(&self.poll_url)
            .query(&[("sessionId", session_id)])
            .send()
            .await
            .map_err(EndpointError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EndpointError::Status(status));
        }

        response.text().await.map_err(EndpointError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered with status {0}")]
    Status(StatusCode),
}
