//! Session state machine for the escape room client.
//!
//! This module provides a pure, side-effect-free state machine for a single
//! play-through. It owns the [`SessionState`], takes [`Event`]s as input
//! (player actions, server replies, timer expiries, clock ticks) and returns
//! the [`Action`]s to execute: calls to make, timers to arm, the clock to
//! start or stop, and [`SessionEvent`]s for the presentation layer.
//!
//! The actual I/O (HTTP calls, timers, rendering) is performed by
//! escape-client, not by this module. This enables instant unit testing
//! without network mocks.
//!
//! Ordering rules enforced here:
//! - at most one answer submission in flight;
//! - hint, reveal and skip share one in-flight token, and a skip also
//!   excludes submission in both directions;
//! - a pending reveal blocks submission, and the token is dropped on every
//!   puzzle change so a late side-channel reply cannot touch the new puzzle;
//! - a revealed answer blocks submission until the puzzle changes;
//! - a time-up reply wins over everything, and nothing is applied once the
//!   session is terminal.

use std::time::Duration;

use escape_types::{
    AnswerResult, CallKind, Puzzle, PuzzleNumber, PuzzleUpdate, Request, ServerResponse,
    SessionSnapshot, SkipResult,
};
use thiserror::Error;

use crate::clock::{ClockEvent, ClockSettings, Countdown, Urgency};
use crate::retry::{RetryAction, RetryEvent, RetryPolicy, RetryState};

/// Default pause that lets answer feedback render before moving on.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(1500);

/// Default pause that lets the skipped answer render before moving on.
pub const DEFAULT_SKIP_DELAY: Duration = Duration::from_millis(2000);

/// Default results page when the local clock runs out.
pub const DEFAULT_RESULT_TARGET: &str = "/result";

/// Message shown for any transport-level failure.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Please try again.";

/// Session errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The room data carried no puzzle.
    #[error("room state has no current puzzle")]
    NoPuzzle,

    /// The session has no puzzles at all.
    #[error("session has no puzzles")]
    NoPuzzles,

    /// The current ordinal is past the end of the session.
    #[error("puzzle {index} is out of range (total {total})")]
    IndexOutOfRange {
        /// Current ordinal
        index: u32,
        /// Session total
        total: u32,
    },
}

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Countdown settings.
    pub clock: ClockSettings,
    /// Generation retry budgets and delays.
    pub retry: RetryPolicy,
    /// Pause after answer feedback before advancing or finishing.
    pub feedback_delay: Duration,
    /// Pause after a skip before advancing or finishing.
    pub skip_delay: Duration,
    /// Results page used when no redirect was supplied.
    pub result_target: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            clock: ClockSettings::default(),
            retry: RetryPolicy::default(),
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            skip_delay: DEFAULT_SKIP_DELAY,
            result_target: DEFAULT_RESULT_TARGET.to_string(),
        }
    }
}

/// Coarse position in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A puzzle is on screen and accepts input.
    AwaitingInput,
    /// Showing feedback before the next puzzle (or the retry loop).
    Advancing,
    /// Polling for a puzzle the server failed to generate.
    RetryingGeneration,
    /// The session was won; waiting to navigate to the results.
    Completing,
    /// Navigated away. Nothing is applied anymore.
    Terminal,
}

/// Visibility of the side panels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Panels {
    /// Hint panel open.
    pub hint: bool,
    /// Revealed-answer panel open.
    pub reveal: bool,
    /// Skipped-answer panel open.
    pub skip: bool,
}

impl Panels {
    fn any_open(&self) -> bool {
        self.hint || self.reveal || self.skip
    }
}

/// Everything the session knows. Owned by [`SessionStateMachine`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Current puzzle ordinal.
    pub puzzle_index: PuzzleNumber,
    /// Puzzles in this session, fixed at start.
    pub total_puzzles: u32,
    /// Cumulative score.
    pub score: u64,
    /// Seconds left on the local countdown.
    pub remaining_seconds: f64,
    /// Display band of the countdown.
    pub urgency: Urgency,
    /// An answer request is in flight.
    pub is_submitting: bool,
    /// The answer to the current puzzle was revealed.
    pub answer_revealed: bool,
    /// Consecutive correct answers.
    pub streak: u32,
    /// Hints taken this session.
    pub hints_used: u32,
    /// The puzzle on screen.
    pub puzzle: Puzzle,
    /// Latest narrative line.
    pub narrative: Option<String>,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Side panel visibility.
    pub panels: Panels,
    /// Side-channel call (hint, reveal or skip) in flight.
    pub panel_in_flight: Option<CallKind>,
}

impl SessionState {
    /// Build the starting state from the room data.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let payload = snapshot.puzzle.ok_or(SessionError::NoPuzzle)?;
        if snapshot.total_puzzles == 0 {
            return Err(SessionError::NoPuzzles);
        }
        let index = PuzzleNumber::new(snapshot.puzzle_number);
        if index.value() > snapshot.total_puzzles {
            return Err(SessionError::IndexOutOfRange {
                index: index.value(),
                total: snapshot.total_puzzles,
            });
        }
        Ok(Self::new(
            payload.into(),
            index,
            snapshot.total_puzzles,
            snapshot.score,
            snapshot.remaining_seconds,
        )
        .with_narrative(snapshot.narrative_log.last().cloned()))
    }

    /// Starting state for a puzzle.
    pub fn new(
        puzzle: Puzzle,
        puzzle_index: PuzzleNumber,
        total_puzzles: u32,
        score: u64,
        remaining_seconds: f64,
    ) -> Self {
        Self {
            puzzle_index,
            total_puzzles,
            score,
            remaining_seconds,
            urgency: Urgency::Normal,
            is_submitting: false,
            answer_revealed: false,
            streak: 0,
            hints_used: 0,
            puzzle,
            narrative: None,
            phase: Phase::AwaitingInput,
            panels: Panels::default(),
            panel_in_flight: None,
        }
    }

    fn with_narrative(mut self, narrative: Option<String>) -> Self {
        self.narrative = narrative;
        self
    }

    /// Progress through the session, as shown on the progress bar.
    pub fn progress_percent(&self) -> u8 {
        if self.total_puzzles == 0 {
            return 0;
        }
        let done = self.puzzle_index.value().saturating_sub(1) as f64;
        ((done / self.total_puzzles as f64) * 100.0).round().min(100.0) as u8
    }
}

/// Timers the session arms. At most one of each kind is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Feedback/skip display delay before the next puzzle or the retry loop.
    Advance,
    /// Display delay before navigating to the results.
    Finish,
    /// Wait between generation attempts.
    RetryBackoff,
}

/// Inputs to the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The player submitted an answer.
    SubmitRequested {
        /// Raw input text
        answer: String,
    },
    /// The player asked for a hint.
    HintRequested,
    /// The player pressed reveal.
    RevealRequested,
    /// The player pressed skip.
    SkipRequested,
    /// The player pressed the manual continuation control.
    ManualRetryRequested,
    /// A call returned a reply.
    Replied(ServerResponse),
    /// A call failed before producing a reply.
    CallFailed {
        /// Which call
        call: CallKind,
        /// What went wrong
        reason: FailureReason,
    },
    /// One countdown period elapsed.
    Tick,
    /// The background time-check is due.
    PollDue,
    /// An armed timer fired.
    TimerFired(Timer),
}

/// Why a call produced no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network error or unreadable reply.
    Connection(String),
    /// The server refused the call with a message for the player.
    Rejected(String),
}

impl FailureReason {
    /// Message to show the player.
    pub fn user_message(&self) -> String {
        match self {
            FailureReason::Connection(_) => CONNECTION_ERROR_MESSAGE.to_string(),
            FailureReason::Rejected(message) => message.clone(),
        }
    }
}

/// Actions to be executed by escape-client.
///
/// These are instructions, not side effects. The client interprets these
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Perform a server call and feed the outcome back as an event.
    Call(Request),
    /// Arm a timer; fire [`Event::TimerFired`] after the delay.
    StartTimer {
        /// Which timer
        timer: Timer,
        /// Delay before it fires
        delay: Duration,
    },
    /// Disarm a timer if pending.
    CancelTimer(Timer),
    /// Start the countdown tick and the background time-check.
    StartClock,
    /// Stop the countdown tick and the background time-check.
    StopClock,
    /// Hand an event to the presentation layer.
    Emit(SessionEvent),
}

/// Events emitted to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new puzzle is on screen.
    PuzzleChanged {
        /// The puzzle
        puzzle: Puzzle,
        /// Its ordinal
        number: PuzzleNumber,
        /// Session total
        total: u32,
        /// Progress bar value
        progress_percent: u8,
        /// Latest narrative line
        narrative: Option<String>,
    },
    /// The countdown display changed.
    ClockChanged {
        /// Seconds left
        remaining: f64,
        /// Display band
        urgency: Urgency,
    },
    /// The countdown moved to another display band.
    UrgencyChanged(Urgency),
    /// Judgement of an answer.
    Feedback {
        /// Accepted or not
        correct: bool,
        /// Message to show
        message: String,
        /// The solved puzzle was the easter egg
        easter_egg: bool,
    },
    /// The score changed.
    ScoreChanged {
        /// New total
        score: u64,
        /// Points just awarded
        delta: u64,
        /// Current streak
        streak: u32,
    },
    /// Empty input was refused without a call.
    InputRejected,
    /// Clear and refocus the answer input.
    ClearInput,
    /// Enable or disable the submit control.
    ControlsChanged {
        /// Submit allowed
        submit_enabled: bool,
    },
    /// A hint was granted.
    HintShown {
        /// Hint text
        text: String,
        /// Encouragement line
        encouragement: Option<String>,
    },
    /// The answer was revealed; scoring on this puzzle is over.
    AnswerRevealed {
        /// Answer text
        answer: String,
    },
    /// The reveal panel was closed again.
    RevealHidden,
    /// The puzzle was skipped.
    Skipped {
        /// Answer of the skipped puzzle
        answer: String,
    },
    /// Hint, reveal and skip panels were closed.
    PanelsCleared,
    /// Generation retry counter.
    RetryProgress {
        /// Current attempt
        attempt: u32,
        /// Budget
        max_attempts: u32,
    },
    /// Automatic retries ran out; show the manual control.
    ManualRetryAvailable {
        /// Attempts made
        attempts: u32,
    },
    /// The last puzzle was solved.
    Victory {
        /// Results page
        redirect: String,
    },
    /// The session clock ran out.
    TimeUp {
        /// Results page
        redirect: String,
    },
    /// Leave the room for another page. Terminal.
    Navigate {
        /// Target page
        target: String,
    },
    /// A transient, user-recoverable error.
    Error {
        /// Message to show
        message: String,
    },
}

/// What the pending [`Timer::Advance`] / [`Timer::Finish`] will do.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Advance(PuzzleUpdate),
    BeginRetry,
    Finish(String),
}

/// The session orchestrator - NO I/O, just state transitions.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    state: SessionState,
    countdown: Countdown,
    retry: RetryState,
    pending: Option<Pending>,
    poll_in_flight: bool,
    config: SessionConfig,
}

impl SessionStateMachine {
    /// Create a machine for a session starting in `state`.
    pub fn new(state: SessionState, config: SessionConfig) -> Result<Self, SessionError> {
        if state.total_puzzles == 0 {
            return Err(SessionError::NoPuzzles);
        }
        if state.puzzle_index.value() > state.total_puzzles {
            return Err(SessionError::IndexOutOfRange {
                index: state.puzzle_index.value(),
                total: state.total_puzzles,
            });
        }
        Ok(Self {
            countdown: Countdown::new(config.clock),
            state,
            retry: RetryState::new(),
            pending: None,
            poll_in_flight: false,
            config,
        })
    }

    /// Put the first puzzle on screen and start the clock.
    pub fn start(&mut self) -> Vec<Action> {
        if self.state.phase == Phase::Terminal {
            return vec![];
        }
        let mut actions = vec![Action::StartClock, self.puzzle_changed()];
        let clock_events = self.countdown.start(self.state.remaining_seconds);
        actions.extend(self.clock_actions(clock_events));
        if self.is_active() {
            actions.push(self.controls_changed());
        }
        self.sync_clock_view();
        actions
    }

    /// Process an event and return the actions to execute.
    ///
    /// This is a pure function of the current state and the event. Once the
    /// session is terminal every event is ignored, which is how late replies
    /// and stray timers are dropped.
    pub fn on_event(&mut self, event: Event) -> Vec<Action> {
        if self.state.phase == Phase::Terminal {
            return vec![];
        }
        let actions = match event {
            Event::SubmitRequested { answer } => self.submit(&answer),
            Event::HintRequested => self.request_hint(),
            Event::RevealRequested => self.request_reveal(),
            Event::SkipRequested => self.request_skip(),
            Event::ManualRetryRequested => self.manual_retry(),
            Event::Replied(response) => self.on_reply(response),
            Event::CallFailed { call, reason } => self.on_failure(call, reason),
            Event::Tick => {
                let events = self.countdown.tick();
                self.clock_actions(events)
            }
            Event::PollDue => self.poll(),
            Event::TimerFired(timer) => self.on_timer(timer),
        };
        self.sync_clock_view();
        actions
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Retry controller state.
    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// The countdown.
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether state changes are still applied.
    pub fn is_active(&self) -> bool {
        self.state.phase != Phase::Terminal
    }

    /// Whether the submit control is enabled.
    pub fn submit_enabled(&self) -> bool {
        self.state.phase == Phase::AwaitingInput
            && !self.state.is_submitting
            && !self.state.answer_revealed
            && !matches!(
                self.state.panel_in_flight,
                Some(CallKind::Skip | CallKind::Reveal)
            )
    }

    // ===========================================
    // Player actions
    // ===========================================

    fn submit(&mut self, answer: &str) -> Vec<Action> {
        if !self.submit_enabled() {
            return vec![];
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return vec![Action::Emit(SessionEvent::InputRejected)];
        }
        self.state.is_submitting = true;
        vec![
            self.controls_changed(),
            Action::Call(Request::SubmitAnswer {
                answer: answer.to_string(),
            }),
        ]
    }

    fn request_hint(&mut self) -> Vec<Action> {
        if !self.panel_available() {
            return vec![];
        }
        self.state.panel_in_flight = Some(CallKind::Hint);
        vec![Action::Call(Request::Hint)]
    }

    fn request_reveal(&mut self) -> Vec<Action> {
        if self.state.panels.reveal {
            self.state.panels.reveal = false;
            return vec![Action::Emit(SessionEvent::RevealHidden)];
        }
        if !self.panel_available() {
            return vec![];
        }
        self.state.panel_in_flight = Some(CallKind::Reveal);
        vec![self.controls_changed(), Action::Call(Request::Reveal)]
    }

    fn request_skip(&mut self) -> Vec<Action> {
        if !self.panel_available() || self.state.is_submitting {
            return vec![];
        }
        self.state.panel_in_flight = Some(CallKind::Skip);
        vec![self.controls_changed(), Action::Call(Request::Skip)]
    }

    fn manual_retry(&mut self) -> Vec<Action> {
        if !self.retry.is_exhausted() {
            return vec![];
        }
        self.apply_retry(RetryEvent::ManualRetry)
    }

    fn panel_available(&self) -> bool {
        self.state.phase == Phase::AwaitingInput && self.state.panel_in_flight.is_none()
    }

    // ===========================================
    // Replies
    // ===========================================

    fn on_reply(&mut self, response: ServerResponse) -> Vec<Action> {
        match response {
            ServerResponse::TimeUp { redirect } => self.expire(redirect),
            ServerResponse::SessionComplete {
                redirect,
                feedback,
                score_delta,
                is_easter_egg,
            } => self.on_session_complete(redirect, feedback, score_delta, is_easter_egg),
            ServerResponse::AnswerResult(result) => self.on_answer(result),
            ServerResponse::HintResult {
                text,
                encouragement,
                remaining_seconds,
            } => self.on_hint(text, encouragement, remaining_seconds),
            ServerResponse::RevealResult { answer } => self.on_reveal(answer),
            ServerResponse::SkipResult(result) => self.on_skip(result),
            ServerResponse::NextPuzzleResult { success, next } => {
                self.on_next_puzzle(success, next)
            }
            ServerResponse::TimeCheckResult { remaining_seconds } => {
                self.poll_in_flight = false;
                match remaining_seconds {
                    Some(seconds) => {
                        let events = self.countdown.reconcile(seconds);
                        self.clock_actions(events)
                    }
                    None => vec![],
                }
            }
        }
    }

    fn on_session_complete(
        &mut self,
        redirect: String,
        feedback: Option<String>,
        score_delta: u64,
        is_easter_egg: bool,
    ) -> Vec<Action> {
        if !self.state.is_submitting {
            return vec![];
        }
        self.state.is_submitting = false;
        let mut actions = self.award(score_delta);
        actions.insert(
            0,
            Action::Emit(SessionEvent::Feedback {
                correct: true,
                message: feedback.unwrap_or_else(|| "Correct!".to_string()),
                easter_egg: is_easter_egg,
            }),
        );
        actions.extend(self.begin_completion(redirect.clone(), self.config.feedback_delay));
        actions.push(Action::Emit(SessionEvent::Victory { redirect }));
        actions
    }

    fn on_answer(&mut self, result: AnswerResult) -> Vec<Action> {
        if !self.state.is_submitting {
            return vec![];
        }
        self.state.is_submitting = false;

        if !result.correct {
            self.state.streak = 0;
            return vec![
                Action::Emit(SessionEvent::Feedback {
                    correct: false,
                    message: result
                        .feedback
                        .unwrap_or_else(|| "Not quite. Try again!".to_string()),
                    easter_egg: false,
                }),
                Action::Emit(SessionEvent::ClearInput),
                self.controls_changed(),
            ];
        }

        let mut actions = vec![Action::Emit(SessionEvent::Feedback {
            correct: true,
            message: result.feedback.unwrap_or_else(|| "Correct!".to_string()),
            easter_egg: result.is_easter_egg,
        })];
        actions.extend(self.award(result.score_delta));

        // A correct answer without a puzzle is handled like a generation failure
        let pending = match result.next {
            Some(next) if !result.needs_retry => Pending::Advance(next),
            _ => Pending::BeginRetry,
        };
        actions.extend(self.schedule_advance(pending, self.config.feedback_delay));
        actions
    }

    fn on_hint(
        &mut self,
        text: String,
        encouragement: Option<String>,
        remaining_seconds: Option<f64>,
    ) -> Vec<Action> {
        if self.state.panel_in_flight != Some(CallKind::Hint) {
            return vec![];
        }
        self.state.panel_in_flight = None;
        self.state.hints_used = self.state.hints_used.saturating_add(1);
        self.state.panels.hint = true;

        let mut actions = vec![Action::Emit(SessionEvent::HintShown {
            text,
            encouragement,
        })];
        if let Some(seconds) = remaining_seconds {
            let events = self.countdown.penalize(seconds);
            actions.extend(self.clock_actions(events));
        }
        actions
    }

    fn on_reveal(&mut self, answer: String) -> Vec<Action> {
        if self.state.panel_in_flight != Some(CallKind::Reveal) {
            return vec![];
        }
        self.state.panel_in_flight = None;
        self.state.answer_revealed = true;
        self.state.panels.reveal = true;
        vec![
            Action::Emit(SessionEvent::AnswerRevealed { answer }),
            self.controls_changed(),
        ]
    }

    fn on_skip(&mut self, result: SkipResult) -> Vec<Action> {
        if self.state.panel_in_flight != Some(CallKind::Skip) {
            return vec![];
        }
        self.state.panel_in_flight = None;
        self.state.streak = 0;
        self.state.panels.skip = true;

        let mut actions = vec![Action::Emit(SessionEvent::Skipped {
            answer: result.answer,
        })];
        if let Some(redirect) = result.redirect {
            actions.extend(self.begin_completion(redirect, self.config.skip_delay));
            return actions;
        }
        let pending = match result.next {
            Some(next) if !result.generation_failed => Pending::Advance(next),
            _ => Pending::BeginRetry,
        };
        actions.extend(self.schedule_advance(pending, self.config.skip_delay));
        actions
    }

    fn on_next_puzzle(&mut self, success: bool, next: Option<PuzzleUpdate>) -> Vec<Action> {
        if !self.retry.is_in_flight() {
            return vec![];
        }
        match next {
            Some(update) if success => {
                let mut actions = self.apply_retry(RetryEvent::Generated);
                actions.extend(self.transition(update));
                actions
            }
            _ => self.apply_retry(RetryEvent::NotReady),
        }
    }

    fn on_failure(&mut self, call: CallKind, reason: FailureReason) -> Vec<Action> {
        match call {
            CallKind::SubmitAnswer if self.state.is_submitting => {
                self.state.is_submitting = false;
                vec![
                    Action::Emit(SessionEvent::Error {
                        message: reason.user_message(),
                    }),
                    self.controls_changed(),
                ]
            }
            CallKind::Hint | CallKind::Reveal | CallKind::Skip
                if self.state.panel_in_flight == Some(call) =>
            {
                self.state.panel_in_flight = None;
                vec![
                    Action::Emit(SessionEvent::Error {
                        message: reason.user_message(),
                    }),
                    self.controls_changed(),
                ]
            }
            CallKind::NextPuzzle if self.retry.is_in_flight() => {
                self.apply_retry(RetryEvent::TransportFailed)
            }
            CallKind::TimeCheck => {
                // Swallowed: the local countdown keeps running and the next poll retries
                self.poll_in_flight = false;
                vec![]
            }
            _ => vec![],
        }
    }

    // ===========================================
    // Clock and timers
    // ===========================================

    fn poll(&mut self) -> Vec<Action> {
        if self.poll_in_flight || !self.countdown.is_running() {
            return vec![];
        }
        self.poll_in_flight = true;
        vec![Action::Call(Request::TimeCheck)]
    }

    fn on_timer(&mut self, timer: Timer) -> Vec<Action> {
        match timer {
            Timer::Advance => match self.pending.take() {
                Some(Pending::Advance(update)) => self.transition(update),
                Some(Pending::BeginRetry) => {
                    self.state.phase = Phase::RetryingGeneration;
                    self.apply_retry(RetryEvent::Begin)
                }
                other => {
                    self.pending = other;
                    vec![]
                }
            },
            Timer::Finish => match self.pending.take() {
                Some(Pending::Finish(target)) => {
                    self.state.phase = Phase::Terminal;
                    vec![Action::Emit(SessionEvent::Navigate { target })]
                }
                other => {
                    self.pending = other;
                    vec![]
                }
            },
            Timer::RetryBackoff => self.apply_retry(RetryEvent::BackoffElapsed),
        }
    }

    fn clock_actions(&mut self, events: Vec<ClockEvent>) -> Vec<Action> {
        let mut actions = Vec::with_capacity(events.len());
        for event in events {
            match event {
                ClockEvent::Changed { remaining, urgency } => {
                    actions.push(Action::Emit(SessionEvent::ClockChanged { remaining, urgency }))
                }
                ClockEvent::UrgencyChanged(urgency) => {
                    actions.push(Action::Emit(SessionEvent::UrgencyChanged(urgency)))
                }
                ClockEvent::Expired => actions.extend(self.expire(None)),
            }
        }
        actions
    }

    fn sync_clock_view(&mut self) {
        self.state.remaining_seconds = self.countdown.remaining();
        self.state.urgency = self.countdown.urgency();
    }

    // ===========================================
    // Transitions
    // ===========================================

    /// Put a new puzzle on screen.
    ///
    /// Used after a correct answer, after a skip, and when the retry loop
    /// produces a puzzle. The server's ordinal wins over a local increment.
    fn transition(&mut self, update: PuzzleUpdate) -> Vec<Action> {
        let number = update
            .server_number()
            .unwrap_or_else(|| self.state.puzzle_index.next())
            .clamp_to(self.state.total_puzzles);

        let had_panels = self.state.panels.any_open();
        self.state.puzzle_index = number;
        self.state.puzzle = update.puzzle;
        if update.narrative.is_some() {
            self.state.narrative = update.narrative;
        }
        self.state.answer_revealed = false;
        self.state.panels = Panels::default();
        // A side-channel reply still out belongs to the previous puzzle
        self.state.panel_in_flight = None;
        self.state.phase = Phase::AwaitingInput;
        self.pending = None;

        let mut actions = Vec::new();
        if had_panels {
            actions.push(Action::Emit(SessionEvent::PanelsCleared));
        }
        actions.push(self.puzzle_changed());
        actions.push(Action::Emit(SessionEvent::ClearInput));
        if let Some(seconds) = update.remaining_seconds {
            let events = self.countdown.reconcile(seconds);
            actions.extend(self.clock_actions(events));
        }
        if self.is_active() {
            actions.push(self.controls_changed());
        }
        actions
    }

    fn schedule_advance(&mut self, pending: Pending, delay: Duration) -> Vec<Action> {
        self.state.phase = Phase::Advancing;
        self.pending = Some(pending);
        vec![
            self.controls_changed(),
            Action::StartTimer {
                timer: Timer::Advance,
                delay,
            },
        ]
    }

    fn begin_completion(&mut self, redirect: String, delay: Duration) -> Vec<Action> {
        self.state.phase = Phase::Completing;
        self.pending = Some(Pending::Finish(redirect));
        self.countdown.stop();
        let mut actions = vec![Action::StopClock];
        actions.extend(self.apply_retry(RetryEvent::Cancel));
        actions.push(self.controls_changed());
        actions.push(Action::StartTimer {
            timer: Timer::Finish,
            delay,
        });
        actions
    }

    /// Session expired: stop everything and leave for the results.
    fn expire(&mut self, redirect: Option<String>) -> Vec<Action> {
        let target = redirect.unwrap_or_else(|| self.config.result_target.clone());
        self.countdown.stop();
        self.pending = None;
        self.poll_in_flight = false;
        self.state.is_submitting = false;
        self.state.panel_in_flight = None;

        let mut actions = vec![
            Action::StopClock,
            Action::CancelTimer(Timer::Advance),
            Action::CancelTimer(Timer::Finish),
        ];
        actions.extend(self.apply_retry(RetryEvent::Cancel));
        self.state.phase = Phase::Terminal;
        actions.push(self.controls_changed());
        actions.push(Action::Emit(SessionEvent::TimeUp {
            redirect: target.clone(),
        }));
        actions.push(Action::Emit(SessionEvent::Navigate { target }));
        actions
    }

    fn apply_retry(&mut self, event: RetryEvent) -> Vec<Action> {
        let (state, retry_actions) = std::mem::take(&mut self.retry).on_event(event, &self.config.retry);
        self.retry = state;
        retry_actions
            .into_iter()
            .map(|action| match action {
                RetryAction::RequestNextPuzzle => Action::Call(Request::NextPuzzle),
                RetryAction::StartBackoff { delay } => Action::StartTimer {
                    timer: Timer::RetryBackoff,
                    delay,
                },
                RetryAction::CancelBackoff => Action::CancelTimer(Timer::RetryBackoff),
                RetryAction::Progress {
                    attempt,
                    max_attempts,
                } => Action::Emit(SessionEvent::RetryProgress {
                    attempt,
                    max_attempts,
                }),
                RetryAction::ShowManualRetry { attempts } => {
                    Action::Emit(SessionEvent::ManualRetryAvailable { attempts })
                }
            })
            .collect()
    }

    fn award(&mut self, delta: u64) -> Vec<Action> {
        self.state.score = self.state.score.saturating_add(delta);
        self.state.streak = self.state.streak.saturating_add(1);
        vec![Action::Emit(SessionEvent::ScoreChanged {
            score: self.state.score,
            delta,
            streak: self.state.streak,
        })]
    }

    fn puzzle_changed(&self) -> Action {
        Action::Emit(SessionEvent::PuzzleChanged {
            puzzle: self.state.puzzle.clone(),
            number: self.state.puzzle_index,
            total: self.state.total_puzzles,
            progress_percent: self.state.progress_percent(),
            narrative: self.state.narrative.clone(),
        })
    }

    fn controls_changed(&self) -> Action {
        Action::Emit(SessionEvent::ControlsChanged {
            submit_enabled: self.submit_enabled(),
        })
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Input {
        Submit(String),
        Hint,
        Reveal,
        Skip,
        Tick,
        Poll,
    }

    fn input() -> impl Strategy<Value = Input> {
        prop_oneof![
            "[ a-z0-9]{0,8}".prop_map(Input::Submit),
            Just(Input::Hint),
            Just(Input::Reveal),
            Just(Input::Skip),
            Just(Input::Tick),
            Just(Input::Poll),
        ]
    }

    fn to_event(input: Input) -> Event {
        match input {
            Input::Submit(answer) => Event::SubmitRequested { answer },
            Input::Hint => Event::HintRequested,
            Input::Reveal => Event::RevealRequested,
            Input::Skip => Event::SkipRequested,
            Input::Tick => Event::Tick,
            Input::Poll => Event::PollDue,
        }
    }

    fn fresh() -> SessionStateMachine {
        let state = SessionState::new(Puzzle::new("Q"), PuzzleNumber::FIRST, 5, 0, 900.0);
        let mut machine = SessionStateMachine::new(state, SessionConfig::default()).unwrap();
        machine.start();
        machine
    }

    fn submit_calls(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::Call(Request::SubmitAnswer { .. })))
            .count()
    }

    proptest! {
        /// Property: without replies, at most one answer request is ever issued.
        #[test]
        fn prop_at_most_one_submission_in_flight(
            inputs in proptest::collection::vec(input(), 1..40),
        ) {
            let mut machine = fresh();
            let mut issued = 0;
            for input in inputs {
                issued += submit_calls(&machine.on_event(to_event(input)));
                prop_assert!(issued <= 1);
            }
        }

        /// Property: once the answer is revealed, no input submits until a transition.
        #[test]
        fn prop_reveal_lockout_holds(answers in proptest::collection::vec(".{0,12}", 1..20)) {
            let mut machine = fresh();
            machine.on_event(Event::RevealRequested);
            machine.on_event(Event::Replied(ServerResponse::RevealResult { answer: "a".into() }));
            for answer in answers {
                let actions = machine.on_event(Event::SubmitRequested { answer });
                prop_assert_eq!(submit_calls(&actions), 0);
                prop_assert!(machine.state().answer_revealed);
            }
        }
    }
}
