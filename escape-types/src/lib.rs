//! # escape-types
//!
//! Wire format types for the escape room game server API.
//!
//! This crate provides the foundational types used across all escape room crates:
//! - [`PuzzleNumber`] - 1-based puzzle ordinal
//! - [`Puzzle`], [`PuzzleUpdate`] - Puzzle value objects received from the server
//! - [`CallKind`], [`Request`], [`RequestBody`] - The calls a client can make
//! - [`AnswerReply`], [`HintReply`], ... - JSON reply bodies as sent by the server
//! - [`ServerResponse`] - The tagged union the session logic dispatches on
//! - [`ProtocolError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;
mod puzzle;
mod request;
mod response;

pub use error::ProtocolError;
pub use ids::PuzzleNumber;
pub use messages::{
    AnswerReply, AnswerRequest, HintReply, NextPuzzleReply, RevealReply, SessionSnapshot,
    SkipReply, StartReply, StartRequest, TimeCheckReply,
};
pub use puzzle::{Puzzle, PuzzlePayload, PuzzleUpdate, DEFAULT_PUZZLE_KIND};
pub use request::{CallKind, ImageUpload, Method, Request, RequestBody, IMAGE_FIELD};
pub use response::{AnswerResult, ServerResponse, SkipResult};
