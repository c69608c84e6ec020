//! Ordinal types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based position of a puzzle within the session.
///
/// Assigned by the server. The client only falls back to [`PuzzleNumber::next`]
/// when a reply omits the ordinal, because skip and custom-image paths can
/// move the index non-sequentially.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct PuzzleNumber(u32);

impl PuzzleNumber {
    /// The first puzzle of a session.
    pub const FIRST: PuzzleNumber = PuzzleNumber(1);

    /// Create a new PuzzleNumber. Zero is lifted to [`PuzzleNumber::FIRST`].
    pub fn new(value: u32) -> Self {
        Self(value.max(1))
    }

    /// Get the numeric value of this PuzzleNumber.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The following ordinal.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Clamp this ordinal to the session's total.
    pub fn clamp_to(&self, total: u32) -> Self {
        Self::new(self.0.min(total.max(1)))
    }
}

impl Default for PuzzleNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl From<u32> for PuzzleNumber {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<PuzzleNumber> for u32 {
    fn from(number: PuzzleNumber) -> Self {
        number.0
    }
}

impl fmt::Display for PuzzleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PuzzleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PuzzleNumber({})", self.0)
    }
}
