//! The tagged union the session logic dispatches on.
//!
//! Every reply body converts into exactly one [`ServerResponse`] variant.
//! `time_up` is inspected before any other field: a session can expire
//! between the player's action and the reply arriving, and the expiry wins
//! over whatever else the reply says.

use crate::messages::{
    AnswerReply, HintReply, NextPuzzleReply, RevealReply, SkipReply, TimeCheckReply,
};
use crate::PuzzleUpdate;

/// Interpreted server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerResponse {
    /// The session clock ran out server-side.
    TimeUp {
        /// Results page, when the server named one
        redirect: Option<String>,
    },
    /// The last puzzle was answered correctly.
    SessionComplete {
        /// Results page
        redirect: String,
        /// Judge feedback
        feedback: Option<String>,
        /// Points awarded for the final puzzle
        score_delta: u64,
        /// The final puzzle was the easter egg
        is_easter_egg: bool,
    },
    /// Judgement of a submitted answer.
    AnswerResult(AnswerResult),
    /// A hint was granted.
    HintResult {
        /// Hint text
        text: String,
        /// Encouragement line
        encouragement: Option<String>,
        /// Server clock after the time penalty
        remaining_seconds: Option<f64>,
    },
    /// The answer of the current puzzle.
    RevealResult {
        /// Answer text
        answer: String,
    },
    /// The current puzzle was skipped.
    SkipResult(SkipResult),
    /// Outcome of a generation retry.
    NextPuzzleResult {
        /// Whether a puzzle is ready
        success: bool,
        /// The puzzle, when ready
        next: Option<PuzzleUpdate>,
    },
    /// Server clock reading.
    TimeCheckResult {
        /// Remaining seconds, absent when no game is active
        remaining_seconds: Option<f64>,
    },
}

impl ServerResponse {
    /// Whether this is the session-expired escape hatch.
    pub fn is_time_up(&self) -> bool {
        matches!(self, ServerResponse::TimeUp { .. })
    }
}

/// Judgement of an answer that did not end the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    /// Whether the answer was accepted
    pub correct: bool,
    /// Judge feedback
    pub feedback: Option<String>,
    /// Points awarded
    pub score_delta: u64,
    /// Next puzzle, when generation succeeded
    pub next: Option<PuzzleUpdate>,
    /// Correct, but the next puzzle must be fetched through the retry loop
    pub needs_retry: bool,
    /// The solved puzzle was the easter egg
    pub is_easter_egg: bool,
}

/// Outcome of a skip that did not expire the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipResult {
    /// Answer of the skipped puzzle
    pub answer: String,
    /// Next puzzle, when generation succeeded
    pub next: Option<PuzzleUpdate>,
    /// Results page when the skipped puzzle was the last one
    pub redirect: Option<String>,
    /// Skip succeeded but the next puzzle failed to generate
    pub generation_failed: bool,
}

impl From<AnswerReply> for ServerResponse {
    fn from(reply: AnswerReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        let score_delta = reply.score.unwrap_or(0);
        if let Some(redirect) = reply.redirect {
            return ServerResponse::SessionComplete {
                redirect,
                feedback: reply.feedback,
                score_delta,
                is_easter_egg: reply.is_easter_egg,
            };
        }
        let next = PuzzleUpdate::from_reply(
            reply.puzzle,
            reply.puzzle_number,
            reply.remaining_seconds,
            &reply.narrative_log,
        );
        ServerResponse::AnswerResult(AnswerResult {
            correct: reply.correct,
            feedback: reply.feedback,
            score_delta: if reply.correct { score_delta } else { 0 },
            next,
            needs_retry: reply.needs_retry,
            is_easter_egg: reply.is_easter_egg,
        })
    }
}

impl From<HintReply> for ServerResponse {
    fn from(reply: HintReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        ServerResponse::HintResult {
            text: reply.hint,
            encouragement: reply.encouragement.filter(|e| !e.is_empty()),
            remaining_seconds: reply.remaining_seconds,
        }
    }
}

impl From<RevealReply> for ServerResponse {
    fn from(reply: RevealReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        ServerResponse::RevealResult {
            answer: reply.answer,
        }
    }
}

impl From<SkipReply> for ServerResponse {
    fn from(reply: SkipReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        let next = PuzzleUpdate::from_reply(
            reply.puzzle,
            reply.puzzle_number,
            reply.remaining_seconds,
            &reply.narrative_log,
        );
        ServerResponse::SkipResult(SkipResult {
            answer: reply.answer,
            next,
            redirect: reply.redirect,
            generation_failed: reply.error_generating,
        })
    }
}

impl From<NextPuzzleReply> for ServerResponse {
    fn from(reply: NextPuzzleReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        let next = PuzzleUpdate::from_reply(
            reply.puzzle,
            reply.puzzle_number,
            reply.remaining_seconds,
            &reply.narrative_log,
        );
        ServerResponse::NextPuzzleResult {
            success: reply.success && next.is_some(),
            next,
        }
    }
}

impl From<TimeCheckReply> for ServerResponse {
    fn from(reply: TimeCheckReply) -> Self {
        if reply.time_up {
            return ServerResponse::TimeUp {
                redirect: reply.redirect,
            };
        }
        ServerResponse::TimeCheckResult {
            remaining_seconds: reply.remaining_seconds,
        }
    }
}
