//! RequestGateway - typed calls against the game server.
//!
//! The gateway turns a [`Request`] into a transport call and the raw reply
//! into a [`ServerResponse`]. It never retries; the session decides what a
//! failure means.
//!
//! # Reply interpretation
//!
//! - `time_up` set: [`ServerResponse::TimeUp`], read before anything else
//!   so a mistyped field elsewhere in the body cannot hide the expiry.
//! - 2xx with a JSON body: decoded into the call's reply struct, then
//!   classified.
//! - non-2xx with an `error` field: [`GatewayError::Rejected`], whose message
//!   is meant for the player.
//! - anything else: a connection-class error.

use escape_types::{
    AnswerReply, CallKind, HintReply, ImageUpload, NextPuzzleReply, ProtocolError, Request,
    RevealReply, ServerResponse, SessionSnapshot, SkipReply, StartReply, TimeCheckReply,
};
use escape_core::FailureReason;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::transport::{Reply, Transport, TransportError};

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No reply was received.
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),

    /// The reply could not be decoded.
    #[error("malformed reply: {0}")]
    Malformed(#[from] ProtocolError),

    /// The server refused the call.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Whether this counts as a connection error for the player.
    pub fn is_connection_error(&self) -> bool {
        !matches!(self, GatewayError::Rejected(_))
    }

    /// Convert to the failure reason the session machine understands.
    pub fn to_failure(&self) -> FailureReason {
        match self {
            GatewayError::Rejected(message) => FailureReason::Rejected(message.clone()),
            other => FailureReason::Connection(other.to_string()),
        }
    }
}

/// Outcome of starting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The session was created.
    Started {
        /// Room page
        redirect: String,
    },
    /// The server refused (unknown theme, generator busy).
    Refused {
        /// Message for the player
        message: String,
    },
}

/// Default room page when the start reply names none.
const DEFAULT_ROOM_TARGET: &str = "/room";

/// Typed access to the game server.
#[derive(Debug)]
pub struct RequestGateway<T: Transport> {
    transport: T,
}

impl<T: Transport> RequestGateway<T> {
    /// Create a gateway over a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform any session call and classify its reply.
    pub async fn execute(&self, request: &Request) -> Result<ServerResponse, GatewayError> {
        let kind = request.kind();
        if matches!(
            kind,
            CallKind::Start | CallKind::StartCustom | CallKind::Snapshot
        ) {
            return Err(not_a_session_call(kind));
        }

        let reply = self.call(request).await?;
        if let Some(expired) = time_up(&reply.body) {
            tracing::debug!(call = %kind, "session time is up");
            return Ok(expired);
        }

        match kind {
            CallKind::SubmitAnswer => Ok(decode_reply::<AnswerReply>(kind, reply)?.into()),
            CallKind::Hint => Ok(decode_reply::<HintReply>(kind, reply)?.into()),
            CallKind::Reveal => Ok(decode_reply::<RevealReply>(kind, reply)?.into()),
            CallKind::Skip => Ok(decode_reply::<SkipReply>(kind, reply)?.into()),
            CallKind::NextPuzzle => Ok(decode_reply::<NextPuzzleReply>(kind, reply)?.into()),
            CallKind::TimeCheck => Ok(decode_reply::<TimeCheckReply>(kind, reply)?.into()),
            other => Err(not_a_session_call(other)),
        }
    }

    /// Submit an answer for the current puzzle.
    pub async fn submit_answer(&self, answer: &str) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::SubmitAnswer {
            answer: answer.to_string(),
        })
        .await
    }

    /// Ask for a hint.
    pub async fn request_hint(&self) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::Hint).await
    }

    /// Reveal the answer of the current puzzle.
    pub async fn reveal_answer(&self) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::Reveal).await
    }

    /// Skip the current puzzle.
    pub async fn skip_puzzle(&self) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::Skip).await
    }

    /// Ask whether the next puzzle is ready.
    pub async fn next_puzzle(&self) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::NextPuzzle).await
    }

    /// Read the server clock.
    pub async fn time_check(&self) -> Result<ServerResponse, GatewayError> {
        self.execute(&Request::TimeCheck).await
    }

    /// Start a new session with a theme and difficulty (1-5).
    pub async fn start_game(
        &self,
        theme: &str,
        difficulty: u8,
    ) -> Result<StartOutcome, GatewayError> {
        self.start(&Request::Start {
            theme: theme.to_string(),
            difficulty,
        })
        .await
    }

    /// Start a custom session built from an uploaded image.
    ///
    /// The server generates the puzzles from the picture, so it may refuse
    /// with a "busy" message when generation fails.
    pub async fn start_custom_game(
        &self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<StartOutcome, GatewayError> {
        self.start(&Request::StartCustom {
            image: ImageUpload::new(filename, image),
        })
        .await
    }

    /// Fetch the room data the session starts from.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, GatewayError> {
        self.send::<SessionSnapshot>(&Request::Snapshot).await
    }

    async fn start(&self, request: &Request) -> Result<StartOutcome, GatewayError> {
        let reply = match self.send::<StartReply>(request).await {
            Ok(reply) => reply,
            Err(GatewayError::Rejected(message)) => return Ok(StartOutcome::Refused { message }),
            Err(e) => return Err(e),
        };

        if let Some(message) = reply.error {
            return Ok(StartOutcome::Refused { message });
        }
        if !reply.success {
            return Ok(StartOutcome::Refused {
                message: "session could not be started".to_string(),
            });
        }
        Ok(StartOutcome::Started {
            redirect: reply
                .redirect
                .unwrap_or_else(|| DEFAULT_ROOM_TARGET.to_string()),
        })
    }

    async fn call(&self, request: &Request) -> Result<Reply, GatewayError> {
        let body = request.body()?;
        Ok(self.transport.call(request.kind(), body).await?)
    }

    async fn send<R: DeserializeOwned>(&self, request: &Request) -> Result<R, GatewayError> {
        let reply = self.call(request).await?;
        decode_reply(request.kind(), reply)
    }
}

fn not_a_session_call(kind: CallKind) -> GatewayError {
    GatewayError::Malformed(ProtocolError::InvalidData(format!(
        "{} is not a session call",
        kind
    )))
}

/// The expiry escape hatch, looked up without decoding any other field.
fn time_up(body: &[u8]) -> Option<ServerResponse> {
    let value: Value = serde_json::from_slice(body).ok()?;
    if value.get("time_up").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    Some(ServerResponse::TimeUp {
        redirect: value
            .get("redirect")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn decode_reply<R: DeserializeOwned>(kind: CallKind, reply: Reply) -> Result<R, GatewayError> {
    if !reply.is_success() {
        let message = serde_json::from_slice::<Value>(&reply.body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
        return match message {
            Some(message) => {
                tracing::debug!(call = %kind, status = reply.status, %message, "call rejected");
                Err(GatewayError::Rejected(message))
            }
            None => Err(GatewayError::Connection(TransportError::RequestFailed(
                format!("{} returned HTTP {}", kind, reply.status),
            ))),
        };
    }

    serde_json::from_slice(&reply.body)
        .map_err(|e| GatewayError::Malformed(ProtocolError::Deserialization(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use escape_types::PuzzleNumber;
    use serde_json::json;

    fn gateway() -> (RequestGateway<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        (RequestGateway::new(transport.clone()), transport)
    }

    // ===========================================
    // Calls
    // ===========================================

    #[tokio::test]
    async fn submit_sends_answer_body() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::SubmitAnswer,
            &json!({"correct": false, "feedback": "Nope"}),
        );

        let response = gateway.submit_answer("42").await.unwrap();
        assert!(matches!(
            response,
            ServerResponse::AnswerResult(ref r) if !r.correct
        ));
        assert_eq!(
            transport.last_body(CallKind::SubmitAnswer),
            Some(br#"{"answer":"42"}"#.to_vec())
        );
    }

    #[tokio::test]
    async fn time_up_is_checked_before_everything() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::Hint,
            &json!({"time_up": true, "redirect": "/result", "hint": "ignored"}),
        );

        let response = gateway.request_hint().await.unwrap();
        assert_eq!(
            response,
            ServerResponse::TimeUp {
                redirect: Some("/result".into())
            }
        );
    }

    #[tokio::test]
    async fn time_up_wins_over_mistyped_fields() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::SubmitAnswer,
            &json!({"time_up": true, "redirect": "/result", "score": 12.5}),
        );
        transport.queue_json(CallKind::Hint, &json!({"time_up": true, "hint": null}));

        assert_eq!(
            gateway.submit_answer("42").await.unwrap(),
            ServerResponse::TimeUp {
                redirect: Some("/result".into())
            }
        );
        assert_eq!(
            gateway.request_hint().await.unwrap(),
            ServerResponse::TimeUp { redirect: None }
        );
    }

    #[tokio::test]
    async fn time_up_wins_over_error_status() {
        let (gateway, transport) = gateway();
        transport.queue_status(
            CallKind::Skip,
            400,
            &json!({"time_up": true, "redirect": "/result", "error": "No active game"}),
        );

        let response = gateway.skip_puzzle().await.unwrap();
        assert!(response.is_time_up());
    }

    #[tokio::test]
    async fn mistyped_field_without_time_up_is_malformed() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::SubmitAnswer,
            &json!({"time_up": false, "correct": true, "score": 12.5}),
        );

        let err = gateway.submit_answer("42").await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[tokio::test]
    async fn snapshot_decodes_room_state() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::Snapshot,
            &json!({"puzzle": {"question": "Q"}, "puzzle_number": 2, "total_puzzles": 5,
                    "score": 150, "remaining_seconds": 640.0}),
        );

        let snapshot = gateway.snapshot().await.unwrap();
        assert_eq!(PuzzleNumber::new(snapshot.puzzle_number).value(), 2);
        assert_eq!(snapshot.score, 150);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn transport_failure_is_connection_error() {
        let (gateway, _transport) = gateway();
        let err = gateway.reveal_answer().await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(matches!(err.to_failure(), FailureReason::Connection(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_malformed() {
        let (gateway, transport) = gateway();
        transport.queue_reply(CallKind::Skip, Reply::ok(b"<html>oops</html>".to_vec()));

        let err = gateway.skip_puzzle().await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn error_status_with_message_is_rejected() {
        let (gateway, transport) = gateway();
        transport.queue_status(
            CallKind::SubmitAnswer,
            400,
            &json!({"error": "Answer already revealed"}),
        );

        let err = gateway.submit_answer("x").await.unwrap_err();
        assert!(!err.is_connection_error());
        assert_eq!(
            err.to_failure(),
            FailureReason::Rejected("Answer already revealed".into())
        );
    }

    #[tokio::test]
    async fn error_status_without_message_is_connection_error() {
        let (gateway, transport) = gateway();
        transport.queue_reply(
            CallKind::TimeCheck,
            Reply {
                status: 502,
                body: b"Bad Gateway".to_vec(),
            },
        );
        let err = gateway.time_check().await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection(_)));
    }

    // ===========================================
    // Start
    // ===========================================

    #[tokio::test]
    async fn start_game_returns_room_redirect() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::Start,
            &json!({"success": true, "redirect": "/room"}),
        );

        let outcome = gateway.start_game("haunted_library", 3).await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Started {
                redirect: "/room".into()
            }
        );
        assert_eq!(
            transport.last_body(CallKind::Start),
            Some(br#"{"theme":"haunted_library","difficulty":3}"#.to_vec())
        );
    }

    #[tokio::test]
    async fn start_game_refusal_carries_message() {
        let (gateway, transport) = gateway();
        transport.queue_status(CallKind::Start, 400, &json!({"error": "Invalid theme"}));

        let outcome = gateway.start_game("nowhere", 3).await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Refused {
                message: "Invalid theme".into()
            }
        );
    }

    #[tokio::test]
    async fn custom_start_uploads_image() {
        let (gateway, transport) = gateway();
        transport.queue_json(
            CallKind::StartCustom,
            &json!({"success": true, "redirect": "/room"}),
        );

        let outcome = gateway
            .start_custom_game(vec![0xff, 0xd8, 0xff], "office.jpg")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Started {
                redirect: "/room".into()
            }
        );

        let upload = transport.last_upload(CallKind::StartCustom).unwrap();
        assert_eq!(upload.filename, "office.jpg");
        assert_eq!(upload.bytes, vec![0xff, 0xd8, 0xff]);
        assert_eq!(transport.last_body(CallKind::StartCustom), None);
    }

    #[tokio::test]
    async fn custom_start_busy_generator_is_refused() {
        let (gateway, transport) = gateway();
        transport.queue_status(
            CallKind::StartCustom,
            503,
            &json!({"error": "AI is busy, please try again."}),
        );

        let outcome = gateway.start_custom_game(vec![1, 2, 3], "a.png").await.unwrap();
        assert_eq!(
            outcome,
            StartOutcome::Refused {
                message: "AI is busy, please try again.".into()
            }
        );
    }

    #[tokio::test]
    async fn execute_refuses_non_session_calls() {
        let (gateway, transport) = gateway();
        let err = gateway.execute(&Request::Snapshot).await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
        let err = gateway
            .execute(&Request::StartCustom {
                image: ImageUpload::new("a.png", vec![]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
        assert!(transport.sent_calls().is_empty());
    }
}
