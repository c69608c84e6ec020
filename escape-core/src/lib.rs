//! # escape-core
//!
//! Pure session logic for the escape room client (no I/O, instant tests).
//!
//! This crate implements the countdown, the generation retry controller and
//! the session state machine without any network access, timers or
//! rendering, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP calls, timers, rendering) is performed by
//! `escape-client`, which interprets the actions produced by these state
//! machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod retry;
pub mod session;

pub use clock::{format_clock, ClockEvent, ClockSettings, Countdown, Urgency};
pub use retry::{AttemptPhase, RetryAction, RetryEvent, RetryPolicy, RetryState};
pub use session::{
    Action, Event, FailureReason, Panels, Phase, SessionConfig, SessionError, SessionEvent,
    SessionState, SessionStateMachine, Timer, CONNECTION_ERROR_MESSAGE, DEFAULT_FEEDBACK_DELAY,
    DEFAULT_RESULT_TARGET, DEFAULT_SKIP_DELAY,
};
