//! Mock transport for testing.
//!
//! Allows queueing replies per call and capturing sent requests for
//! verification.

use super::{Reply, Transport, TransportError};
use async_trait::async_trait;
use escape_types::{CallKind, ImageUpload, RequestBody};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock transport for testing.
///
/// Replies are queued per [`CallKind`] and handed out in order. A call
/// with nothing queued fails like an unreachable server.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent: Vec<(CallKind, Option<RequestBody>)>,
    replies: HashMap<CallKind, VecDeque<Reply>>,
    fail_next: HashMap<CallKind, String>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw reply for the next call of `kind`.
    pub fn queue_reply(&self, kind: CallKind, reply: Reply) {
        let mut inner = self.inner.lock().unwrap();
        inner.replies.entry(kind).or_default().push_back(reply);
    }

    /// Queue a 200 JSON reply for the next call of `kind`.
    pub fn queue_json(&self, kind: CallKind, body: &serde_json::Value) {
        self.queue_status(kind, 200, body);
    }

    /// Queue a JSON reply with an explicit status.
    pub fn queue_status(&self, kind: CallKind, status: u16, body: &serde_json::Value) {
        self.queue_reply(
            kind,
            Reply {
                status,
                body: body.to_string().into_bytes(),
            },
        );
    }

    /// Cause the next call of `kind` to fail with the given error.
    pub fn fail_next(&self, kind: CallKind, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next.insert(kind, error.to_string());
    }

    /// Delay every reply, to simulate a slow server.
    pub fn set_latency(&self, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.latency = Some(latency);
    }

    /// Get every call that was made, in order.
    pub fn sent_calls(&self) -> Vec<CallKind> {
        let inner = self.inner.lock().unwrap();
        inner.sent.iter().map(|(kind, _)| *kind).collect()
    }

    /// Count the calls made of one kind.
    pub fn call_count(&self, kind: CallKind) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.sent.iter().filter(|(k, _)| *k == kind).count()
    }

    /// Get the JSON body of the last call of `kind`.
    pub fn last_body(&self, kind: CallKind) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .sent
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, body)| body.as_ref()?.as_json().map(<[u8]>::to_vec))
    }

    /// Get the image uploaded by the last call of `kind`.
    pub fn last_upload(&self, kind: CallKind) -> Option<ImageUpload> {
        let inner = self.inner.lock().unwrap();
        inner
            .sent
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, body)| match body {
                Some(RequestBody::Image(image)) => Some(image.clone()),
                _ => None,
            })
    }

    /// Clear all state (calls, queues, failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(
        &self,
        kind: CallKind,
        body: Option<RequestBody>,
    ) -> Result<Reply, TransportError> {
        let (outcome, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.sent.push((kind, body));

            // Check for forced failure
            let outcome = match inner.fail_next.remove(&kind) {
                Some(error) => Err(TransportError::ConnectionFailed(error)),
                None => inner
                    .replies
                    .get_mut(&kind)
                    .and_then(VecDeque::pop_front)
                    .ok_or_else(|| {
                        TransportError::ConnectionFailed(format!("no reply queued for {}", kind))
                    }),
            };
            (outcome, inner.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}
