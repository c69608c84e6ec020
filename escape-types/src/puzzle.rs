//! Puzzle value objects.
//!
//! A [`Puzzle`] is never mutated once received. The next one replaces it
//! wholesale when the session transitions.

use serde::{Deserialize, Serialize};

use crate::PuzzleNumber;

/// Type label used when the server omits one.
pub const DEFAULT_PUZZLE_KIND: &str = "riddle";

/// Puzzle as the client keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    /// Ordinal carried inside the payload, if any
    pub number: Option<PuzzleNumber>,
    /// Question text shown to the player
    pub question: String,
    /// Type label (riddle, cipher, logic, visual, ...)
    pub kind: String,
    /// Whether this is the double-score easter egg puzzle
    pub is_easter_egg: bool,
}

impl Puzzle {
    /// Create a puzzle with the default type label.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            number: None,
            question: question.into(),
            kind: DEFAULT_PUZZLE_KIND.to_string(),
            is_easter_egg: false,
        }
    }

    /// Set the type label.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the in-payload ordinal.
    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(PuzzleNumber::new(number));
        self
    }

    /// Mark as the easter egg puzzle.
    pub fn easter_egg(mut self) -> Self {
        self.is_easter_egg = true;
        self
    }
}

/// Puzzle payload exactly as the server sends it.
///
/// The server is inconsistent about the type key (`puzzle_type` or `type`)
/// and sends extra fields the client must not rely on; unknown keys are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PuzzlePayload {
    /// Ordinal, when the server embeds it in the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_number: Option<u32>,
    /// Question text
    #[serde(default)]
    pub question: String,
    /// Type label, preferred key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_type: Option<String>,
    /// Type label, legacy key
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    /// Easter egg flag
    #[serde(default)]
    pub is_easter_egg: bool,
}

impl From<PuzzlePayload> for Puzzle {
    fn from(payload: PuzzlePayload) -> Self {
        let kind = payload
            .puzzle_type
            .or(payload.type_label)
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PUZZLE_KIND.to_string());
        Self {
            number: payload.puzzle_number.map(PuzzleNumber::new),
            question: payload.question,
            kind,
            is_easter_egg: payload.is_easter_egg,
        }
    }
}

/// Everything a reply carries about the puzzle the session moves to.
#[derive(Debug, Clone, PartialEq)]
pub struct PuzzleUpdate {
    /// The new puzzle
    pub puzzle: Puzzle,
    /// Top-level `puzzle_number` of the reply
    pub number: Option<PuzzleNumber>,
    /// Server clock at the time of the reply
    pub remaining_seconds: Option<f64>,
    /// Latest narrative line (last entry of `narrative_log`)
    pub narrative: Option<String>,
}

impl PuzzleUpdate {
    /// Wrap a puzzle with no extra reply metadata.
    pub fn new(puzzle: Puzzle) -> Self {
        Self {
            puzzle,
            number: None,
            remaining_seconds: None,
            narrative: None,
        }
    }

    /// Ordinal the server assigned, preferring the reply's top-level field
    /// over the one embedded in the payload.
    pub fn server_number(&self) -> Option<PuzzleNumber> {
        self.number.or(self.puzzle.number)
    }

    /// Set the top-level ordinal.
    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(PuzzleNumber::new(number));
        self
    }

    /// Set the server clock value.
    pub fn with_remaining(mut self, seconds: f64) -> Self {
        self.remaining_seconds = Some(seconds);
        self
    }

    /// Set the narrative line.
    pub fn with_narrative(mut self, text: impl Into<String>) -> Self {
        self.narrative = Some(text.into());
        self
    }

    /// Assemble an update from the loose top-level fields of a reply.
    pub(crate) fn from_reply(
        payload: Option<PuzzlePayload>,
        number: Option<u32>,
        remaining_seconds: Option<f64>,
        narrative_log: &[String],
    ) -> Option<Self> {
        payload.map(|payload| Self {
            puzzle: payload.into(),
            number: number.map(PuzzleNumber::new),
            remaining_seconds,
            narrative: narrative_log.last().cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_prefers_puzzle_type_key() {
        let payload: PuzzlePayload = serde_json::from_str(
            r#"{"question": "What has keys?", "puzzle_type": "riddle", "type": "cipher"}"#,
        )
        .unwrap();
        let puzzle = Puzzle::from(payload);
        assert_eq!(puzzle.kind, "riddle");
    }

    #[test]
    fn payload_falls_back_to_type_key() {
        let payload: PuzzlePayload =
            serde_json::from_str(r#"{"question": "Decode XLI", "type": "cipher"}"#).unwrap();
        assert_eq!(Puzzle::from(payload).kind, "cipher");
    }

    #[test]
    fn payload_without_type_defaults_to_riddle() {
        let payload: PuzzlePayload =
            serde_json::from_str(r#"{"question": "Q", "puzzle_type": ""}"#).unwrap();
        assert_eq!(Puzzle::from(payload).kind, DEFAULT_PUZZLE_KIND);
    }

    #[test]
    fn payload_ignores_server_only_fields() {
        // The server's puzzle dict also carries the answer and hints
        let payload: PuzzlePayload = serde_json::from_str(
            r#"{"question": "Q", "answer": "secret", "hints": ["a"], "attempts": 2, "is_easter_egg": true}"#,
        )
        .unwrap();
        let puzzle = Puzzle::from(payload);
        assert!(puzzle.is_easter_egg);
        assert_eq!(puzzle.number, None);
    }

    #[test]
    fn top_level_number_wins_over_payload_number() {
        let update = PuzzleUpdate::new(Puzzle::new("Q").with_number(2)).with_number(4);
        assert_eq!(update.server_number(), Some(PuzzleNumber::new(4)));

        let payload_only = PuzzleUpdate::new(Puzzle::new("Q").with_number(2));
        assert_eq!(payload_only.server_number(), Some(PuzzleNumber::new(2)));

        assert_eq!(PuzzleUpdate::new(Puzzle::new("Q")).server_number(), None);
    }

    #[test]
    fn from_reply_takes_last_narrative_line() {
        let update = PuzzleUpdate::from_reply(
            Some(PuzzlePayload {
                question: "Q".into(),
                ..Default::default()
            }),
            Some(3),
            Some(512.0),
            &["first".to_string(), "latest".to_string()],
        )
        .unwrap();
        assert_eq!(update.narrative.as_deref(), Some("latest"));
        assert_eq!(update.number, Some(PuzzleNumber::new(3)));
        assert_eq!(update.remaining_seconds, Some(512.0));

        assert!(PuzzleUpdate::from_reply(None, Some(3), None, &[]).is_none());
    }
}
