//! Retry controller for next-puzzle generation.
//!
//! When the server accepts an answer but fails to produce the next puzzle,
//! the client polls `next-puzzle` a bounded number of times with a fixed
//! delay between attempts. When the budget runs out the controller stops and
//! asks for a manual continuation; it never re-arms itself.
//!
//! Like the rest of this crate the controller is a pure state machine: it
//! takes events and returns the new state plus actions. Timers and requests
//! are the caller's job, which lets a session expiry cancel the loop between
//! attempts.

use std::time::Duration;

/// Default attempt budget right after a correct-but-not-ready answer.
pub const DEFAULT_AUTO_MAX_ATTEMPTS: u32 = 4;

/// Default attempt budget for a manual continuation.
pub const DEFAULT_MANUAL_MAX_ATTEMPTS: u32 = 3;

/// Default delay after the server reports the puzzle is not ready.
pub const DEFAULT_NOT_READY_DELAY: Duration = Duration::from_secs(3);

/// Default delay after a transport failure.
pub const DEFAULT_TRANSPORT_DELAY: Duration = Duration::from_secs(2);

/// Attempt budgets and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Budget for the automatic path.
    pub auto_max_attempts: u32,
    /// Budget for each manual continuation.
    pub manual_max_attempts: u32,
    /// Wait after an explicit not-ready reply.
    pub not_ready_delay: Duration,
    /// Wait after a transport error.
    pub transport_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            auto_max_attempts: DEFAULT_AUTO_MAX_ATTEMPTS,
            manual_max_attempts: DEFAULT_MANUAL_MAX_ATTEMPTS,
            not_ready_delay: DEFAULT_NOT_READY_DELAY,
            transport_delay: DEFAULT_TRANSPORT_DELAY,
        }
    }
}

/// Where an attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    /// The next-puzzle request is out.
    InFlight,
    /// Waiting before the next attempt.
    Backoff,
}

/// Retry controller state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// Nothing to retry.
    Idle,
    /// Working through the attempt budget.
    Retrying {
        /// Current attempt, 1-based.
        attempt: u32,
        /// Budget for this run.
        max_attempts: u32,
        /// Request out or waiting.
        phase: AttemptPhase,
    },
    /// A puzzle arrived.
    Succeeded,
    /// Budget spent; only a manual retry continues.
    Exhausted {
        /// Attempts made in the run that ran out.
        attempts: u32,
    },
}

impl RetryState {
    /// Create a new controller in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller is responsible
    /// for executing the returned actions.
    pub fn on_event(self, event: RetryEvent, policy: &RetryPolicy) -> (Self, Vec<RetryAction>) {
        match (self, event) {
            // Start of a run
            (Self::Idle | Self::Succeeded, RetryEvent::Begin) => {
                start_run(policy.auto_max_attempts)
            }
            (Self::Exhausted { .. }, RetryEvent::ManualRetry) => {
                start_run(policy.manual_max_attempts)
            }

            // Attempt outcomes
            (
                Self::Retrying {
                    phase: AttemptPhase::InFlight,
                    ..
                },
                RetryEvent::Generated,
            ) => (Self::Succeeded, vec![]),
            (
                Self::Retrying {
                    attempt,
                    max_attempts,
                    phase: AttemptPhase::InFlight,
                },
                RetryEvent::NotReady,
            ) => attempt_failed(attempt, max_attempts, policy.not_ready_delay),
            (
                Self::Retrying {
                    attempt,
                    max_attempts,
                    phase: AttemptPhase::InFlight,
                },
                RetryEvent::TransportFailed,
            ) => attempt_failed(attempt, max_attempts, policy.transport_delay),

            // Backoff over
            (
                Self::Retrying {
                    attempt,
                    max_attempts,
                    phase: AttemptPhase::Backoff,
                },
                RetryEvent::BackoffElapsed,
            ) => {
                let attempt = attempt.saturating_add(1);
                (
                    Self::Retrying {
                        attempt,
                        max_attempts,
                        phase: AttemptPhase::InFlight,
                    },
                    vec![
                        RetryAction::Progress {
                            attempt,
                            max_attempts,
                        },
                        RetryAction::RequestNextPuzzle,
                    ],
                )
            }

            // Cancellation
            (Self::Retrying { phase, .. }, RetryEvent::Cancel) => {
                let actions = match phase {
                    AttemptPhase::Backoff => vec![RetryAction::CancelBackoff],
                    AttemptPhase::InFlight => vec![],
                };
                (Self::Idle, actions)
            }
            (Self::Exhausted { .. } | Self::Succeeded, RetryEvent::Cancel) => (Self::Idle, vec![]),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if a run is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Retrying { .. })
    }

    /// Check if the budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check if a next-puzzle request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Retrying {
                phase: AttemptPhase::InFlight,
                ..
            }
        )
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs to the retry controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// Generation failed after a correct answer or a skip.
    Begin,
    /// The server produced the puzzle.
    Generated,
    /// The server is still generating.
    NotReady,
    /// The request itself failed.
    TransportFailed,
    /// The backoff timer fired.
    BackoffElapsed,
    /// The player pressed the manual continuation control.
    ManualRetry,
    /// Abandon the run (session over).
    Cancel,
}

/// Actions to be executed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Issue a next-puzzle request.
    RequestNextPuzzle,
    /// Start the backoff timer.
    StartBackoff {
        /// How long to wait
        delay: Duration,
    },
    /// Cancel a pending backoff timer.
    CancelBackoff,
    /// Update the visible `attempt/max` counter.
    Progress {
        /// Current attempt
        attempt: u32,
        /// Budget
        max_attempts: u32,
    },
    /// Present the manual continuation control.
    ShowManualRetry {
        /// Attempts made before giving up
        attempts: u32,
    },
}

fn start_run(max_attempts: u32) -> (RetryState, Vec<RetryAction>) {
    let max_attempts = max_attempts.max(1);
    (
        RetryState::Retrying {
            attempt: 1,
            max_attempts,
            phase: AttemptPhase::InFlight,
        },
        vec![
            RetryAction::Progress {
                attempt: 1,
                max_attempts,
            },
            RetryAction::RequestNextPuzzle,
        ],
    )
}

fn attempt_failed(
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
) -> (RetryState, Vec<RetryAction>) {
    if attempt >= max_attempts {
        (
            RetryState::Exhausted { attempts: attempt },
            vec![RetryAction::ShowManualRetry { attempts: attempt }],
        )
    } else {
        (
            RetryState::Retrying {
                attempt,
                max_attempts,
                phase: AttemptPhase::Backoff,
            },
            vec![RetryAction::StartBackoff { delay }],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max: u32) -> RetryPolicy {
        RetryPolicy {
            auto_max_attempts: max,
            manual_max_attempts: max,
            ..RetryPolicy::default()
        }
    }

    fn requests(actions: &[RetryAction]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, RetryAction::RequestNextPuzzle))
            .count()
    }

    #[test]
    fn starts_idle() {
        let state = RetryState::new();
        assert!(matches!(state, RetryState::Idle));
        assert!(!state.is_active());
    }

    #[test]
    fn begin_issues_first_request() {
        let (state, actions) = RetryState::Idle.on_event(RetryEvent::Begin, &policy(4));

        assert_eq!(
            state,
            RetryState::Retrying {
                attempt: 1,
                max_attempts: 4,
                phase: AttemptPhase::InFlight
            }
        );
        assert_eq!(requests(&actions), 1);
        assert!(actions.contains(&RetryAction::Progress {
            attempt: 1,
            max_attempts: 4
        }));
    }

    #[test]
    fn generated_transitions_to_succeeded() {
        let (state, _) = RetryState::Idle.on_event(RetryEvent::Begin, &policy(4));
        let (state, actions) = state.on_event(RetryEvent::Generated, &policy(4));
        assert_eq!(state, RetryState::Succeeded);
        assert!(actions.is_empty());
    }

    #[test]
    fn not_ready_waits_three_seconds() {
        let (state, _) = RetryState::Idle.on_event(RetryEvent::Begin, &policy(4));
        let (state, actions) = state.on_event(RetryEvent::NotReady, &policy(4));

        assert!(matches!(
            state,
            RetryState::Retrying {
                attempt: 1,
                phase: AttemptPhase::Backoff,
                ..
            }
        ));
        assert_eq!(
            actions,
            vec![RetryAction::StartBackoff {
                delay: Duration::from_secs(3)
            }]
        );
    }

    #[test]
    fn transport_failure_waits_two_seconds() {
        let (state, _) = RetryState::Idle.on_event(RetryEvent::Begin, &policy(4));
        let (_, actions) = state.on_event(RetryEvent::TransportFailed, &policy(4));
        assert_eq!(
            actions,
            vec![RetryAction::StartBackoff {
                delay: Duration::from_secs(2)
            }]
        );
    }

    #[test]
    fn backoff_elapsed_advances_attempt() {
        let state = RetryState::Retrying {
            attempt: 2,
            max_attempts: 4,
            phase: AttemptPhase::Backoff,
        };
        let (state, actions) = state.on_event(RetryEvent::BackoffElapsed, &policy(4));

        assert!(matches!(
            state,
            RetryState::Retrying {
                attempt: 3,
                phase: AttemptPhase::InFlight,
                ..
            }
        ));
        assert!(actions.contains(&RetryAction::Progress {
            attempt: 3,
            max_attempts: 4
        }));
        assert_eq!(requests(&actions), 1);
    }

    #[test]
    fn three_failures_exhaust_a_budget_of_three() {
        let policy = policy(3);
        let mut total_requests = 0;

        let (mut state, actions) = RetryState::Idle.on_event(RetryEvent::Begin, &policy);
        total_requests += requests(&actions);

        for _ in 0..3 {
            let (next, actions) = state.on_event(RetryEvent::NotReady, &policy);
            state = next;
            total_requests += requests(&actions);
            let (next, actions) = state.on_event(RetryEvent::BackoffElapsed, &policy);
            state = next;
            total_requests += requests(&actions);
        }

        assert_eq!(state, RetryState::Exhausted { attempts: 3 });
        assert_eq!(total_requests, 3);

        // Stray timer or failure events do not re-arm the loop
        for event in [
            RetryEvent::BackoffElapsed,
            RetryEvent::NotReady,
            RetryEvent::TransportFailed,
            RetryEvent::Begin,
        ] {
            let (next, actions) = state.on_event(event, &policy);
            state = next;
            assert!(actions.is_empty(), "{:?} must not act", event);
        }
        assert!(state.is_exhausted());
    }

    #[test]
    fn exhaustion_presents_manual_control() {
        let state = RetryState::Retrying {
            attempt: 3,
            max_attempts: 3,
            phase: AttemptPhase::InFlight,
        };
        let (state, actions) = state.on_event(RetryEvent::TransportFailed, &policy(3));
        assert!(state.is_exhausted());
        assert_eq!(actions, vec![RetryAction::ShowManualRetry { attempts: 3 }]);
    }

    #[test]
    fn manual_retry_gets_fresh_budget() {
        let policy = RetryPolicy::default();
        let state = RetryState::Exhausted { attempts: 4 };
        let (state, actions) = state.on_event(RetryEvent::ManualRetry, &policy);

        assert_eq!(
            state,
            RetryState::Retrying {
                attempt: 1,
                max_attempts: DEFAULT_MANUAL_MAX_ATTEMPTS,
                phase: AttemptPhase::InFlight
            }
        );
        assert_eq!(requests(&actions), 1);
    }

    #[test]
    fn manual_retry_ignored_unless_exhausted() {
        let policy = RetryPolicy::default();
        let (state, actions) = RetryState::Idle.on_event(RetryEvent::ManualRetry, &policy);
        assert_eq!(state, RetryState::Idle);
        assert!(actions.is_empty());
    }

    #[test]
    fn cancel_during_backoff_cancels_timer() {
        let state = RetryState::Retrying {
            attempt: 2,
            max_attempts: 4,
            phase: AttemptPhase::Backoff,
        };
        let (state, actions) = state.on_event(RetryEvent::Cancel, &policy(4));
        assert_eq!(state, RetryState::Idle);
        assert_eq!(actions, vec![RetryAction::CancelBackoff]);
    }

    #[test]
    fn zero_budget_still_makes_one_attempt() {
        let (state, actions) = RetryState::Idle.on_event(RetryEvent::Begin, &policy(0));
        assert_eq!(requests(&actions), 1);
        let (state, _) = state.on_event(RetryEvent::NotReady, &policy(0));
        assert!(state.is_exhausted());
    }
}
