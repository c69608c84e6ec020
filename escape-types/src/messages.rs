//! JSON bodies exchanged with the game server.
//!
//! Reply structs mirror the server's loose JSON: every field is optional or
//! defaulted so that a missing key never fails decoding. Interpretation
//! happens in [`crate::ServerResponse`].

use serde::{Deserialize, Serialize};

use crate::PuzzlePayload;

/// Body of `POST /answer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Player answer, already trimmed
    pub answer: String,
}

/// Body of `POST /start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    /// Theme key
    pub theme: String,
    /// Difficulty 1-5
    pub difficulty: u8,
}

/// Reply to `POST /answer`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerReply {
    /// Session expired before the answer was judged
    pub time_up: bool,
    /// Results page, present on time-up and on session completion
    pub redirect: Option<String>,
    /// Whether the answer was accepted
    pub correct: bool,
    /// Judge feedback text
    pub feedback: Option<String>,
    /// Points awarded for this puzzle
    pub score: Option<u64>,
    /// Next puzzle, when the server produced one
    pub puzzle: Option<PuzzlePayload>,
    /// Ordinal of the next puzzle
    pub puzzle_number: Option<u32>,
    /// Answer was correct but the next puzzle failed to generate
    pub needs_retry: bool,
    /// The solved puzzle was the easter egg
    pub is_easter_egg: bool,
    /// Server clock
    pub remaining_seconds: Option<f64>,
    /// Story so far
    pub narrative_log: Vec<String>,
    /// Session total after a completing answer
    pub total_score: Option<u64>,
    /// Server-side rejection message
    pub error: Option<String>,
}

/// Reply to `POST /hint`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintReply {
    /// Session expired
    pub time_up: bool,
    /// Results page on time-up
    pub redirect: Option<String>,
    /// Hint text
    pub hint: String,
    /// Encouragement line
    pub encouragement: Option<String>,
    /// Server clock after the hint penalty
    pub remaining_seconds: Option<f64>,
    /// Hints taken on the current puzzle
    pub hints_used: Option<u32>,
    /// Seconds the hint cost
    pub time_penalty: Option<f64>,
    /// Server-side rejection message
    pub error: Option<String>,
}

/// Reply to `POST /reveal`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealReply {
    /// Session expired
    pub time_up: bool,
    /// Results page on time-up
    pub redirect: Option<String>,
    /// The answer of the current puzzle
    pub answer: String,
    /// Server-side rejection message
    pub error: Option<String>,
}

/// Reply to `POST /skip`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkipReply {
    /// Session expired
    pub time_up: bool,
    /// Results page, present on time-up and when the skipped puzzle was the last
    pub redirect: Option<String>,
    /// Always true on a successful skip
    pub skipped: bool,
    /// Answer of the skipped puzzle
    pub answer: String,
    /// Next puzzle
    pub puzzle: Option<PuzzlePayload>,
    /// Ordinal of the next puzzle
    pub puzzle_number: Option<u32>,
    /// Server clock
    pub remaining_seconds: Option<f64>,
    /// Story so far
    pub narrative_log: Vec<String>,
    /// Skip succeeded but the next puzzle failed to generate
    pub error_generating: bool,
    /// Server-side rejection message
    pub error: Option<String>,
}

/// Reply to `POST /next-puzzle`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextPuzzleReply {
    /// Session expired
    pub time_up: bool,
    /// Results page on time-up
    pub redirect: Option<String>,
    /// Whether a puzzle is ready
    pub success: bool,
    /// The generated puzzle
    pub puzzle: Option<PuzzlePayload>,
    /// Its ordinal
    pub puzzle_number: Option<u32>,
    /// Server clock
    pub remaining_seconds: Option<f64>,
    /// Story so far
    pub narrative_log: Vec<String>,
    /// Generation still failing
    pub needs_retry: bool,
    /// Server-side rejection message
    pub error: Option<String>,
}

/// Reply to `POST /time-check`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeCheckReply {
    /// Session expired
    pub time_up: bool,
    /// Results page on time-up
    pub redirect: Option<String>,
    /// Whether a game is in progress
    pub active: Option<bool>,
    /// Server clock
    pub remaining_seconds: Option<f64>,
}

/// Reply to `POST /start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartReply {
    /// Whether the session was created
    pub success: bool,
    /// Room page to go to
    pub redirect: Option<String>,
    /// Failure message (invalid theme, generator busy)
    pub error: Option<String>,
}

/// Reply to `GET /room-state`: the data the room page is rendered from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    /// Current puzzle
    pub puzzle: Option<PuzzlePayload>,
    /// Current ordinal
    pub puzzle_number: u32,
    /// Puzzles in this session
    pub total_puzzles: u32,
    /// Score so far
    pub score: u64,
    /// Server clock
    pub remaining_seconds: f64,
    /// Story so far
    pub narrative_log: Vec<String>,
}
