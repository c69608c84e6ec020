//! HTTP transport for the game server.
//!
//! The server keys the session on a cookie, so one [`HttpTransport`] holds
//! one cookie jar for the whole play-through. Clone it to share the jar.

use super::{Reply, Transport, TransportError};
use async_trait::async_trait;
use escape_types::{CallKind, Method, RequestBody, IMAGE_FIELD};
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Transport over HTTP with a session cookie jar.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url` (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with an explicit per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, kind: CallKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::ReceiveFailed(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        kind: CallKind,
        body: Option<RequestBody>,
    ) -> Result<Reply, TransportError> {
        let url = self.url(kind);
        let mut request = match kind.method() {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        match body {
            Some(RequestBody::Json(bytes)) => {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }
            Some(RequestBody::Image(image)) => {
                let content_type = image.content_type();
                let part = Part::bytes(image.bytes)
                    .file_name(image.filename)
                    .mime_str(content_type)
                    .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
                request = request.multipart(Form::new().part(IMAGE_FIELD, part));
            }
            None => {}
        }

        tracing::debug!(call = %kind, %url, "sending request");
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(Reply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:5000");
        assert_eq!(
            transport.url(CallKind::NextPuzzle),
            "http://127.0.0.1:5000/next-puzzle"
        );
        assert_eq!(
            transport.url(CallKind::Snapshot),
            "http://127.0.0.1:5000/room-state"
        );
        assert_eq!(
            transport.url(CallKind::StartCustom),
            "http://127.0.0.1:5000/start-custom"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_failure() {
        // Port 9 (discard) is closed on CI hosts
        let transport =
            HttpTransport::with_timeout("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let result = transport.call(CallKind::TimeCheck, None).await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed(_)) | Err(TransportError::Timeout)
        ));
    }
}
