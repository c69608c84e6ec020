//! Countdown with server reconciliation.
//!
//! The local countdown ticks down between server syncs. The server's clock is
//! authoritative, but small differences are ignored so the display does not
//! jitter; only drift beyond the threshold (suspended tabs, slow ticks) snaps
//! the local value. Hint penalties bypass the threshold.
//!
//! The countdown never schedules anything itself. The client drives
//! [`Countdown::tick`] from a periodic task and feeds server readings into
//! [`Countdown::reconcile`] / [`Countdown::penalize`].

use std::time::Duration;

/// Default tick period.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Default period of the background time-check poll.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default tolerance before the local clock is resynchronized.
pub const DEFAULT_DRIFT_THRESHOLD_SECS: f64 = 5.0;

/// Default start of the warning band.
pub const DEFAULT_WARNING_SECS: f64 = 180.0;

/// Default start of the urgent band.
pub const DEFAULT_URGENT_SECS: f64 = 60.0;

/// Tunables for the countdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSettings {
    /// Amount removed per tick, and the period the client ticks at.
    pub tick: Duration,
    /// Period of the background time-check.
    pub poll_interval: Duration,
    /// Differences up to this many seconds are not corrected.
    pub drift_threshold_secs: f64,
    /// Remaining time at or below which the clock shows a warning.
    pub warning_secs: f64,
    /// Remaining time at or below which the clock shows as urgent.
    pub urgent_secs: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            poll_interval: DEFAULT_POLL_INTERVAL,
            drift_threshold_secs: DEFAULT_DRIFT_THRESHOLD_SECS,
            warning_secs: DEFAULT_WARNING_SECS,
            urgent_secs: DEFAULT_URGENT_SECS,
        }
    }
}

/// Display band of the remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    /// Plenty of time left.
    Normal,
    /// Running low.
    Warning,
    /// About to expire.
    Urgent,
}

impl Urgency {
    /// Band for a remaining time.
    pub fn for_remaining(seconds: f64, settings: &ClockSettings) -> Self {
        if seconds <= settings.urgent_secs {
            Urgency::Urgent
        } else if seconds <= settings.warning_secs {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// Something the display (or the session) should react to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// The displayed value changed.
    Changed {
        /// Seconds left
        remaining: f64,
        /// Current band
        urgency: Urgency,
    },
    /// The display band changed.
    UrgencyChanged(Urgency),
    /// The countdown reached zero. Emitted once.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Idle,
    Running,
    Stopped,
    Expired,
}

/// Local countdown, corrected against the server.
#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: f64,
    urgency: Urgency,
    status: Status,
    settings: ClockSettings,
}

impl Countdown {
    /// Create an idle countdown.
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            remaining: 0.0,
            urgency: Urgency::Normal,
            status: Status::Idle,
            settings,
        }
    }

    /// Set the starting value and start accepting ticks.
    pub fn start(&mut self, initial_seconds: f64) -> Vec<ClockEvent> {
        if self.status == Status::Expired {
            return vec![];
        }
        self.status = Status::Running;
        self.urgency = Urgency::for_remaining(clamp(initial_seconds), &self.settings);
        self.set(initial_seconds)
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> Vec<ClockEvent> {
        if self.status != Status::Running {
            return vec![];
        }
        let step = self.settings.tick.as_secs_f64();
        self.set(self.remaining - step)
    }

    /// Correct local drift against a server reading.
    ///
    /// Differences within the drift threshold are ignored.
    pub fn reconcile(&mut self, server_seconds: f64) -> Vec<ClockEvent> {
        if self.status != Status::Running {
            return vec![];
        }
        let server = clamp(server_seconds);
        if (self.remaining - server).abs() > self.settings.drift_threshold_secs {
            self.set(server)
        } else {
            vec![]
        }
    }

    /// Overwrite with a server reading, no threshold.
    pub fn penalize(&mut self, server_seconds: f64) -> Vec<ClockEvent> {
        if self.status != Status::Running {
            return vec![];
        }
        self.set(server_seconds)
    }

    /// Stop ticking without signaling expiry. Idempotent.
    pub fn stop(&mut self) {
        if self.status != Status::Expired {
            self.status = Status::Stopped;
        }
    }

    /// Seconds left, never negative.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Current display band.
    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    /// Whether ticks are being accepted.
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Whether zero was reached.
    pub fn is_expired(&self) -> bool {
        self.status == Status::Expired
    }

    /// The settings this countdown was built with.
    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    fn set(&mut self, seconds: f64) -> Vec<ClockEvent> {
        self.remaining = clamp(seconds);
        let mut events = Vec::with_capacity(2);

        let urgency = Urgency::for_remaining(self.remaining, &self.settings);
        if urgency != self.urgency {
            self.urgency = urgency;
            events.push(ClockEvent::UrgencyChanged(urgency));
        }
        events.push(ClockEvent::Changed {
            remaining: self.remaining,
            urgency: self.urgency,
        });

        if self.remaining <= 0.0 {
            self.status = Status::Expired;
            events.push(ClockEvent::Expired);
        }
        events
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(ClockSettings::default())
    }
}

fn clamp(seconds: f64) -> f64 {
    if seconds.is_nan() || seconds < 0.0 {
        0.0
    } else {
        seconds
    }
}

/// Render seconds as `MM:SS`.
pub fn format_clock(seconds: f64) -> String {
    let total = clamp(seconds).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(initial: f64) -> Countdown {
        let mut clock = Countdown::default();
        clock.start(initial);
        clock
    }

    fn expired_count(events: &[ClockEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ClockEvent::Expired))
            .count()
    }

    // ===========================================
    // Ticking
    // ===========================================

    #[test]
    fn idle_countdown_ignores_ticks() {
        let mut clock = Countdown::default();
        assert!(clock.tick().is_empty());
        assert_eq!(clock.remaining(), 0.0);
    }

    #[test]
    fn tick_decrements_one_second() {
        let mut clock = running(90.0);
        let events = clock.tick();
        assert_eq!(clock.remaining(), 89.0);
        assert!(events
            .iter()
            .any(|e| matches!(e, ClockEvent::Changed { remaining, .. } if *remaining == 89.0)));
    }

    #[test]
    fn expiry_signaled_exactly_once() {
        let mut clock = running(2.0);
        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(clock.tick());
        }
        assert_eq!(expired_count(&events), 1);
        assert!(clock.is_expired());
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 0.0);
    }

    #[test]
    fn fractional_start_clamps_at_zero() {
        let mut clock = running(0.5);
        let events = clock.tick();
        assert_eq!(clock.remaining(), 0.0);
        assert_eq!(expired_count(&events), 1);
    }

    #[test]
    fn stop_is_idempotent_and_blocks_ticks() {
        let mut clock = running(30.0);
        clock.stop();
        clock.stop();
        assert!(clock.tick().is_empty());
        assert_eq!(clock.remaining(), 30.0);
        assert!(!clock.is_expired());
    }

    #[test]
    fn start_at_zero_expires_immediately() {
        let mut clock = Countdown::default();
        let events = clock.start(0.0);
        assert_eq!(expired_count(&events), 1);
        assert!(clock.tick().is_empty());
    }

    // ===========================================
    // Urgency bands
    // ===========================================

    #[test]
    fn ninety_seconds_enters_urgent_once_after_sixty_five_ticks() {
        let mut clock = running(90.0);
        assert_eq!(clock.urgency(), Urgency::Warning);

        let mut changes = Vec::new();
        for _ in 0..65 {
            for event in clock.tick() {
                if let ClockEvent::UrgencyChanged(u) = event {
                    changes.push(u);
                }
            }
        }

        assert_eq!(clock.remaining(), 25.0);
        assert_eq!(clock.urgency(), Urgency::Urgent);
        // Exactly one band change, and warning never comes back
        assert_eq!(changes, vec![Urgency::Urgent]);
    }

    #[test]
    fn bands_follow_thresholds() {
        let settings = ClockSettings::default();
        assert_eq!(Urgency::for_remaining(900.0, &settings), Urgency::Normal);
        assert_eq!(Urgency::for_remaining(180.0, &settings), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(60.0, &settings), Urgency::Urgent);
        assert_eq!(Urgency::for_remaining(0.0, &settings), Urgency::Urgent);
    }

    // ===========================================
    // Reconciliation
    // ===========================================

    #[test]
    fn small_drift_is_ignored() {
        let mut clock = running(500.0);
        assert!(clock.reconcile(504.0).is_empty());
        assert!(clock.reconcile(495.0).is_empty());
        assert_eq!(clock.remaining(), 500.0);
    }

    #[test]
    fn large_drift_snaps_to_server() {
        let mut clock = running(500.0);
        let events = clock.reconcile(470.0);
        assert_eq!(clock.remaining(), 470.0);
        assert!(!events.is_empty());
    }

    #[test]
    fn negative_server_value_clamps_and_expires() {
        let mut clock = running(30.0);
        let events = clock.reconcile(-12.0);
        assert_eq!(clock.remaining(), 0.0);
        assert_eq!(expired_count(&events), 1);
    }

    #[test]
    fn penalize_overwrites_without_threshold() {
        let mut clock = running(500.0);
        clock.penalize(498.0);
        assert_eq!(clock.remaining(), 498.0);
        clock.penalize(440.0);
        assert_eq!(clock.remaining(), 440.0);
    }

    #[test]
    fn reconcile_after_expiry_does_nothing() {
        let mut clock = running(1.0);
        clock.tick();
        assert!(clock.reconcile(300.0).is_empty());
        assert!(clock.penalize(300.0).is_empty());
        assert_eq!(clock.remaining(), 0.0);
    }

    #[test]
    fn format_pads_minutes_and_seconds() {
        assert_eq!(format_clock(900.0), "15:00");
        assert_eq!(format_clock(65.7), "01:05");
        assert_eq!(format_clock(-3.0), "00:00");
    }
}
