//! Plain-text rendering of session events.

use escape_client::PresentationSink;
use escape_core::{format_clock, SessionEvent, Urgency};

/// Prints session events to stdout.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl TerminalSink {
    /// Create a terminal sink.
    pub fn new() -> Self {
        Self
    }
}

impl PresentationSink for TerminalSink {
    fn present(&mut self, event: &SessionEvent) {
        if let Some(line) = render(event) {
            println!("{}", line);
        }
    }
}

/// Render one event as terminal text; `None` for events with no text.
pub fn render(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::PuzzleChanged {
            puzzle,
            number,
            total,
            progress_percent,
            narrative,
        } => {
            let mut text = String::new();
            if let Some(narrative) = narrative {
                text.push_str(&format!("\n  {}\n", narrative));
            }
            let egg = if puzzle.is_easter_egg { " *" } else { "" };
            text.push_str(&format!(
                "\n[Puzzle {}/{} | {} | {}%{}]\n{}",
                number, total, puzzle.kind, progress_percent, egg, puzzle.question
            ));
            Some(text)
        }
        SessionEvent::ClockChanged { remaining, urgency } => {
            // Full minutes, plus every second of the last ten
            let whole = remaining.round() as u64;
            let on_minute = whole % 60 == 0 && *remaining > 0.0;
            let final_seconds = *remaining <= 10.0 && *remaining > 0.0;
            if on_minute || final_seconds {
                Some(format!("  ({} left{})", format_clock(*remaining), urgency_tag(*urgency)))
            } else {
                None
            }
        }
        SessionEvent::UrgencyChanged(urgency) => match urgency {
            Urgency::Normal => None,
            Urgency::Warning => Some("  Time is running low.".to_string()),
            Urgency::Urgent => Some("  Hurry! Less than a minute left.".to_string()),
        },
        SessionEvent::Feedback {
            correct,
            message,
            easter_egg,
        } => {
            let mark = if *correct { "+" } else { "x" };
            let egg = if *easter_egg { " (easter egg!)" } else { "" };
            Some(format!("{} {}{}", mark, message, egg))
        }
        SessionEvent::ScoreChanged {
            score,
            delta,
            streak,
        } => Some(format!("  +{} points, score {} (streak {})", delta, score, streak)),
        SessionEvent::InputRejected => Some("  Please enter an answer.".to_string()),
        SessionEvent::HintShown {
            text,
            encouragement,
        } => {
            let mut line = format!("  Hint: {}", text);
            if let Some(encouragement) = encouragement {
                line.push_str(&format!("\n  {}", encouragement));
            }
            Some(line)
        }
        SessionEvent::AnswerRevealed { answer } => Some(format!(
            "  The answer is: {} (submit is locked for this puzzle; /skip to move on)",
            answer
        )),
        SessionEvent::RevealHidden => Some("  Answer hidden.".to_string()),
        SessionEvent::Skipped { answer } => Some(format!("  Skipped. The answer was: {}", answer)),
        SessionEvent::RetryProgress {
            attempt,
            max_attempts,
        } => Some(format!(
            "  Generating next puzzle... (attempt {}/{})",
            attempt, max_attempts
        )),
        SessionEvent::ManualRetryAvailable { .. } => {
            Some("  The next puzzle is taking long. Type /retry to keep trying.".to_string())
        }
        SessionEvent::Victory { .. } => Some("\n*** You escaped! ***".to_string()),
        SessionEvent::TimeUp { .. } => Some("\n*** Time's up! ***".to_string()),
        SessionEvent::Navigate { target } => Some(format!("  (results: {})", target)),
        SessionEvent::Error { message } => Some(format!("! {}", message)),
        SessionEvent::ClearInput
        | SessionEvent::ControlsChanged { .. }
        | SessionEvent::PanelsCleared => None,
    }
}

fn urgency_tag(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Normal => "",
        Urgency::Warning => ", hurry",
        Urgency::Urgent => ", HURRY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_types::{Puzzle, PuzzleNumber};

    #[test]
    fn puzzle_shows_position_and_question() {
        let text = render(&SessionEvent::PuzzleChanged {
            puzzle: Puzzle::new("Decode: KHOOR").with_kind("cipher"),
            number: PuzzleNumber::new(2),
            total: 5,
            progress_percent: 20,
            narrative: Some("A drawer clicks open.".into()),
        })
        .unwrap();
        assert!(text.contains("[Puzzle 2/5 | cipher | 20%]"));
        assert!(text.contains("Decode: KHOOR"));
        assert!(text.contains("A drawer clicks open."));
    }

    #[test]
    fn clock_prints_on_minutes_and_final_seconds() {
        let at = |remaining: f64| {
            render(&SessionEvent::ClockChanged {
                remaining,
                urgency: Urgency::Normal,
            })
        };
        assert_eq!(at(600.0).as_deref(), Some("  (10:00 left)"));
        assert!(at(599.0).is_none());
        assert!(at(9.0).is_some());
        assert!(at(0.0).is_none());
    }

    #[test]
    fn silent_events_render_nothing() {
        assert!(render(&SessionEvent::ClearInput).is_none());
        assert!(render(&SessionEvent::PanelsCleared).is_none());
        assert!(render(&SessionEvent::ControlsChanged {
            submit_enabled: true
        })
        .is_none());
        assert!(render(&SessionEvent::UrgencyChanged(Urgency::Normal)).is_none());
    }

    #[test]
    fn errors_are_marked() {
        assert_eq!(
            render(&SessionEvent::Error {
                message: "Connection error. Please try again.".into()
            })
            .as_deref(),
            Some("! Connection error. Please try again.")
        );
    }
}
