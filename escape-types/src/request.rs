//! Calls the client can make against the game server.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AnswerRequest, ProtocolError, StartRequest};

/// HTTP method of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// Call discriminator, used to route replies and release busy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Submit an answer for the current puzzle
    SubmitAnswer,
    /// Request a hint (costs time)
    Hint,
    /// Reveal the answer (forfeits scoring on this puzzle)
    Reveal,
    /// Skip the current puzzle
    Skip,
    /// Retry generating the next puzzle
    NextPuzzle,
    /// Read the server clock
    TimeCheck,
    /// Start a new session
    Start,
    /// Start a custom session from an uploaded image
    StartCustom,
    /// Read the room bootstrap data
    Snapshot,
}

impl CallKind {
    /// Server path for this call.
    pub fn path(&self) -> &'static str {
        match self {
            CallKind::SubmitAnswer => "/answer",
            CallKind::Hint => "/hint",
            CallKind::Reveal => "/reveal",
            CallKind::Skip => "/skip",
            CallKind::NextPuzzle => "/next-puzzle",
            CallKind::TimeCheck => "/time-check",
            CallKind::Start => "/start",
            CallKind::StartCustom => "/start-custom",
            CallKind::Snapshot => "/room-state",
        }
    }

    /// HTTP method for this call.
    pub fn method(&self) -> Method {
        match self {
            CallKind::Snapshot => Method::Get,
            _ => Method::Post,
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::SubmitAnswer => "submit-answer",
            CallKind::Hint => "request-hint",
            CallKind::Reveal => "reveal-answer",
            CallKind::Skip => "skip-puzzle",
            CallKind::NextPuzzle => "next-puzzle",
            CallKind::TimeCheck => "time-check",
            CallKind::Start => "start",
            CallKind::StartCustom => "start-custom",
            CallKind::Snapshot => "room-state",
        };
        f.write_str(name)
    }
}

/// A call the session wants performed, with its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `POST /answer {answer}`
    SubmitAnswer {
        /// Trimmed answer text
        answer: String,
    },
    /// `POST /hint`
    Hint,
    /// `POST /reveal`
    Reveal,
    /// `POST /skip`
    Skip,
    /// `POST /next-puzzle`
    NextPuzzle,
    /// `POST /time-check`
    TimeCheck,
    /// `POST /start {theme, difficulty}`
    Start {
        /// Theme key
        theme: String,
        /// Difficulty 1-5
        difficulty: u8,
    },
    /// `POST /start-custom`, multipart with the image in the `image` field
    StartCustom {
        /// The uploaded image
        image: ImageUpload,
    },
    /// `GET /room-state`
    Snapshot,
}

/// Form field the server reads an uploaded image from.
pub const IMAGE_FIELD: &str = "image";

/// An image sent as a multipart form upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// File name reported to the server
    pub filename: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload from a file name and its contents.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// MIME type guessed from the file extension.
    pub fn content_type(&self) -> &'static str {
        let extension = self
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            _ => "application/octet-stream",
        }
    }
}

/// Encoded body of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/json`
    Json(Vec<u8>),
    /// `multipart/form-data` carrying one image in [`IMAGE_FIELD`]
    Image(ImageUpload),
}

impl RequestBody {
    /// The JSON bytes, when this is a JSON body.
    pub fn as_json(&self) -> Option<&[u8]> {
        match self {
            RequestBody::Json(bytes) => Some(bytes),
            RequestBody::Image(_) => None,
        }
    }
}

impl Request {
    /// Discriminator of this request.
    pub fn kind(&self) -> CallKind {
        match self {
            Request::SubmitAnswer { .. } => CallKind::SubmitAnswer,
            Request::Hint => CallKind::Hint,
            Request::Reveal => CallKind::Reveal,
            Request::Skip => CallKind::Skip,
            Request::NextPuzzle => CallKind::NextPuzzle,
            Request::TimeCheck => CallKind::TimeCheck,
            Request::Start { .. } => CallKind::Start,
            Request::StartCustom { .. } => CallKind::StartCustom,
            Request::Snapshot => CallKind::Snapshot,
        }
    }

    /// Encoded body for this request, if it carries one.
    pub fn body(&self) -> Result<Option<RequestBody>, ProtocolError> {
        let json = match self {
            Request::SubmitAnswer { answer } => serde_json::to_vec(&AnswerRequest {
                answer: answer.clone(),
            }),
            Request::Start { theme, difficulty } => serde_json::to_vec(&StartRequest {
                theme: theme.clone(),
                difficulty: *difficulty,
            }),
            Request::StartCustom { image } => return Ok(Some(RequestBody::Image(image.clone()))),
            _ => return Ok(None),
        };
        json.map(|bytes| Some(RequestBody::Json(bytes)))
            .map_err(ProtocolError::Serialization)
    }
}
