//! Transport abstraction for the game server API.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (HTTP, mock for testing).
//!
//! # Design
//!
//! The transport is request/response oriented: one `call()` per
//! [`CallKind`], returning the raw status and body. Interpreting the body
//! is the gateway's job; a transport never looks inside it.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_json(CallKind::TimeCheck, &json!({"remaining_seconds": 812}));
//! let reply = transport.call(CallKind::TimeCheck, None).await?;
//! assert!(reply.is_success());
//! ```

mod http;
mod mock;

pub use http::{HttpTransport, DEFAULT_REQUEST_TIMEOUT};
pub use mock::MockTransport;

use async_trait::async_trait;
use escape_types::{CallKind, RequestBody};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Request could not be built or sent.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Reading the reply body failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Raw server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Body bytes, usually JSON.
    pub body: Vec<u8>,
}

impl Reply {
    /// A 200 reply with the given body.
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for issuing game server calls.
///
/// Implementations handle the underlying connection mechanism
/// (HTTP with a cookie-held session, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one call and return the raw reply.
    ///
    /// `body` is the encoded request body, if the call has one. A reply
    /// with a non-2xx status is still `Ok`; only failing to get a reply at
    /// all is an error.
    async fn call(&self, kind: CallKind, body: Option<RequestBody>)
        -> Result<Reply, TransportError>;
}
