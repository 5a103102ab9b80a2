use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Response};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{WEBHOOK_REQUESTS, WEBHOOK_REQUEST_DURATION, WEBHOOK_REQUEST_ERRORS};
use crate::types::{AudioClip, SessionId, TextTurn, WebhookReply};

/// Multipart field carrying the recorded audio.
const AUDIO_FIELD: &str = "audioData";

/// Multipart field carrying the session identifier.
const SESSION_FIELD: &str = "sessionId";

/// File name attached to the recorded audio part.
const VOICE_FILE_NAME: &str = "voice.webm";

/// Delivers turns to the remote agent and returns its decoded reply.
///
/// Implementations must not retry; a failed turn is reported once and the
/// caller decides what to show.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a typed message.
    async fn send_text(&self, session_id: &SessionId, text: &str) -> Result<WebhookReply>;

    /// Send a recorded voice message.
    async fn send_voice(&self, session_id: &SessionId, clip: &AudioClip) -> Result<WebhookReply>;
}

/// Client for one fixed webhook endpoint.
#[derive(Debug, Clone)]
pub struct Webhook {
    client: ReqwestClient,
    url: Url,
    timeout: Option<Duration>,
}

impl Webhook {
    /// Create a new webhook client with no request timeout.
    pub fn new(url: Url) -> Result<Self> {
        Self::with_options(url, None)
    }

    /// Create a new webhook client with custom settings.
    pub fn with_options(url: Url, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    /// The endpoint every turn is posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The per-request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Turn a raw response into a reply, mapping failures onto our Error type.
    async fn process_response(response: Response) -> Result<WebhookReply> {
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response: {}", e),
                Some(Box::new(e)),
            )
        })?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            } else {
                body
            };
            return Err(Error::api(status.as_u16(), message));
        }

        WebhookReply::parse(&body)
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<WebhookReply> {
        WEBHOOK_REQUESTS.click();
        let start = Instant::now();
        let result = match request.send().await {
            Ok(response) => Self::process_response(response).await,
            Err(e) => Err(self.map_send_error(e)),
        };
        WEBHOOK_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            WEBHOOK_REQUEST_ERRORS.click();
        }
        result
    }
}

#[async_trait::async_trait]
impl Transport for Webhook {
    async fn send_text(&self, session_id: &SessionId, text: &str) -> Result<WebhookReply> {
        tracing::debug!(session = %session_id, len = text.len(), "sending text turn");
        let body = TextTurn::new(session_id.clone(), text);
        let request = self
            .client
            .post(self.url.clone())
            .headers(Self::default_headers())
            .json(&body);
        self.post(request).await
    }

    async fn send_voice(&self, session_id: &SessionId, clip: &AudioClip) -> Result<WebhookReply> {
        tracing::debug!(session = %session_id, bytes = clip.len(), "sending voice turn");
        let part = Part::bytes(clip.data().to_vec())
            .file_name(VOICE_FILE_NAME)
            .mime_str(clip.mime_type())
            .map_err(|e| {
                Error::http_client(
                    format!("Invalid audio MIME type {}: {}", clip.mime_type(), e),
                    Some(Box::new(e)),
                )
            })?;
        let form = Form::new()
            .part(AUDIO_FIELD, part)
            .text(SESSION_FIELD, session_id.as_str().to_string());
        let request = self
            .client
            .post(self.url.clone())
            .headers(Self::default_headers())
            .multipart(form);
        self.post(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let url = Url::parse("https://hooks.example.com/chat").unwrap();
        let client = Webhook::new(url.clone()).unwrap();
        assert_eq!(client.url(), &url);
        assert_eq!(client.timeout(), None);

        let client = Webhook::with_options(url, Some(Duration::from_secs(30))).unwrap();
        assert_eq!(client.timeout(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = Url::parse(&format!("http://127.0.0.1:{port}/webhook")).unwrap();
        let client = Webhook::with_options(url, Some(Duration::from_secs(5))).unwrap();
        let err = client
            .send_text(&SessionId::new("session-test"), "hello")
            .await
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }
}
