//! GameSession - the runtime that drives one play-through.
//!
//! This module provides [`GameSession`], which owns a
//! [`SessionStateMachine`] and interprets its actions: server calls through
//! the [`RequestGateway`], display and backoff timers, the countdown tick and
//! the background time-check.
//!
//! # Architecture
//!
//! ```text
//! SessionHandle ──commands──▶ event loop ──▶ PresentationSink
//!                                 │  ▲
//!                    spawned calls│  │events
//!                    and timers   ▼  │
//!                          RequestGateway / tokio::time
//! ```
//!
//! The state machine is only touched inside the loop. Calls and timers run
//! as spawned tasks that post their outcome back as an [`Event`]. Every task
//! is aborted when the session reaches its terminal state or is shut down.
//!
//! # Example
//!
//! ```ignore
//! let transport = HttpTransport::new("http://127.0.0.1:5000")?;
//! let gateway = Arc::new(RequestGateway::new(transport));
//! let (handle, task) = GameSession::connect(gateway, SessionConfig::default(), sink).await?;
//!
//! handle.submit("piano")?;
//! let outcome = task.await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use escape_core::{
    Action, Event, SessionConfig, SessionError, SessionEvent, SessionState, SessionStateMachine,
    Timer,
};
use escape_types::Request;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::gateway::{GatewayError, RequestGateway};
use crate::sink::PresentationSink;
use crate::transport::Transport;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The room data could not start a session.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The session loop has ended.
    #[error("session closed")]
    Closed,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// State at the moment the loop stopped.
    pub final_state: SessionState,
    /// Page the session navigated to; `None` when shut down early.
    pub destination: Option<String>,
}

#[derive(Debug)]
enum Command {
    Player(Event),
    Shutdown,
}

/// Player-side handle to a running session.
///
/// Cheap to clone. All methods fail with [`ClientError::Closed`] once the
/// loop has ended.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Submit an answer.
    pub fn submit(&self, answer: impl Into<String>) -> Result<(), ClientError> {
        self.send(Event::SubmitRequested {
            answer: answer.into(),
        })
    }

    /// Ask for a hint.
    pub fn hint(&self) -> Result<(), ClientError> {
        self.send(Event::HintRequested)
    }

    /// Reveal the answer, or hide it when already shown.
    pub fn reveal(&self) -> Result<(), ClientError> {
        self.send(Event::RevealRequested)
    }

    /// Skip the current puzzle.
    pub fn skip(&self) -> Result<(), ClientError> {
        self.send(Event::SkipRequested)
    }

    /// Continue a generation retry after the automatic attempts ran out.
    pub fn retry_generation(&self) -> Result<(), ClientError> {
        self.send(Event::ManualRetryRequested)
    }

    /// Stop the session without navigating anywhere.
    pub fn shutdown(&self) -> Result<(), ClientError> {
        self.commands
            .send(Command::Shutdown)
            .map_err(|_| ClientError::Closed)
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Whether the loop is still running.
    pub fn is_open(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, event: Event) -> Result<(), ClientError> {
        self.commands
            .send(Command::Player(event))
            .map_err(|_| ClientError::Closed)
    }
}

/// Entry points for running a session.
pub struct GameSession;

impl GameSession {
    /// Fetch the room data and start a session from it.
    pub async fn connect<T, S>(
        gateway: Arc<RequestGateway<T>>,
        config: SessionConfig,
        sink: S,
    ) -> Result<(SessionHandle, JoinHandle<SessionOutcome>), ClientError>
    where
        T: Transport + 'static,
        S: PresentationSink,
    {
        let snapshot = gateway.snapshot().await?;
        let state = SessionState::from_snapshot(snapshot)?;
        let machine = SessionStateMachine::new(state, config)?;
        tracing::info!(
            puzzle = %machine.state().puzzle_index,
            total = machine.state().total_puzzles,
            remaining = machine.state().remaining_seconds,
            "session connected"
        );
        Ok(Self::spawn(gateway, machine, sink))
    }

    /// Run an already-built machine on the current tokio runtime.
    pub fn spawn<T, S>(
        gateway: Arc<RequestGateway<T>>,
        machine: SessionStateMachine,
        sink: S,
    ) -> (SessionHandle, JoinHandle<SessionOutcome>)
    where
        T: Transport + 'static,
        S: PresentationSink,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(machine.state().clone());

        let session_loop = SessionLoop {
            machine,
            gateway,
            sink,
            commands: command_rx,
            events: event_rx,
            event_tx,
            state_tx,
            timers: HashMap::new(),
            clock: None,
            calls: Vec::new(),
            destination: None,
        };
        let task = tokio::spawn(session_loop.run());

        (
            SessionHandle {
                commands: command_tx,
                state: state_rx,
            },
            task,
        )
    }
}

struct ClockTasks {
    ticker: JoinHandle<()>,
    poller: JoinHandle<()>,
}

impl ClockTasks {
    fn abort(self) {
        self.ticker.abort();
        self.poller.abort();
    }
}

struct SessionLoop<T: Transport, S> {
    machine: SessionStateMachine,
    gateway: Arc<RequestGateway<T>>,
    sink: S,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedReceiver<Event>,
    event_tx: mpsc::UnboundedSender<Event>,
    state_tx: watch::Sender<SessionState>,
    timers: HashMap<Timer, JoinHandle<()>>,
    clock: Option<ClockTasks>,
    calls: Vec<JoinHandle<()>>,
    destination: Option<String>,
}

impl<T, S> SessionLoop<T, S>
where
    T: Transport + 'static,
    S: PresentationSink,
{
    async fn run(mut self) -> SessionOutcome {
        let actions = self.machine.start();
        self.execute(actions);

        while self.machine.is_active() {
            let event = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Player(event)) => event,
                    Some(Command::Shutdown) => {
                        tracing::info!("session shut down");
                        break;
                    }
                    None => {
                        tracing::info!("all session handles dropped");
                        break;
                    }
                },
                Some(event) = self.events.recv() => event,
            };

            tracing::trace!(?event, "session event");
            let actions = self.machine.on_event(event);
            self.execute(actions);
        }

        self.teardown();
        tracing::info!(
            destination = self.destination.as_deref().unwrap_or("-"),
            score = self.machine.state().score,
            "session ended"
        );
        SessionOutcome {
            final_state: self.machine.state().clone(),
            destination: self.destination,
        }
    }

    fn execute(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Call(request) => self.spawn_call(request),
                Action::StartTimer { timer, delay } => {
                    let tx = self.event_tx.clone();
                    let handle = tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = tx.send(Event::TimerFired(timer));
                    });
                    if let Some(previous) = self.timers.insert(timer, handle) {
                        previous.abort();
                    }
                }
                Action::CancelTimer(timer) => {
                    if let Some(handle) = self.timers.remove(&timer) {
                        handle.abort();
                    }
                }
                Action::StartClock => self.start_clock(),
                Action::StopClock => {
                    if let Some(clock) = self.clock.take() {
                        tracing::debug!("clock stopped");
                        clock.abort();
                    }
                }
                Action::Emit(event) => self.present(event),
            }
        }
        self.state_tx.send_replace(self.machine.state().clone());
    }

    fn present(&mut self, event: SessionEvent) {
        match &event {
            SessionEvent::Navigate { target } => {
                tracing::info!(%target, "navigating");
                self.destination = Some(target.clone());
            }
            SessionEvent::RetryProgress {
                attempt,
                max_attempts,
            } => {
                tracing::info!(attempt, max_attempts, "generating next puzzle");
            }
            SessionEvent::ManualRetryAvailable { attempts } => {
                tracing::warn!(attempts, "puzzle generation still failing");
            }
            _ => {}
        }
        self.sink.present(&event);
    }

    fn spawn_call(&mut self, request: Request) {
        self.calls.retain(|handle| !handle.is_finished());

        let gateway = Arc::clone(&self.gateway);
        let tx = self.event_tx.clone();
        let kind = request.kind();
        tracing::debug!(call = %kind, "calling server");

        self.calls.push(tokio::spawn(async move {
            let event = match gateway.execute(&request).await {
                Ok(response) => Event::Replied(response),
                Err(error) => {
                    tracing::warn!(call = %kind, %error, "call failed");
                    Event::CallFailed {
                        call: kind,
                        reason: error.to_failure(),
                    }
                }
            };
            let _ = tx.send(event);
        }));
    }

    fn start_clock(&mut self) {
        if let Some(previous) = self.clock.take() {
            previous.abort();
        }
        let settings = self.machine.config().clock;
        tracing::debug!(
            tick_ms = settings.tick.as_millis() as u64,
            poll_secs = settings.poll_interval.as_secs(),
            "clock started"
        );

        let ticker = spawn_periodic(settings.tick, self.event_tx.clone(), || Event::Tick);
        let poller = spawn_periodic(settings.poll_interval, self.event_tx.clone(), || {
            Event::PollDue
        });
        self.clock = Some(ClockTasks { ticker, poller });
    }

    fn teardown(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        for handle in self.calls.drain(..) {
            handle.abort();
        }
        self.state_tx.send_replace(self.machine.state().clone());
    }
}

/// Post an event every `period`, starting one period from now.
fn spawn_periodic(
    period: std::time::Duration,
    tx: mpsc::UnboundedSender<Event>,
    make: fn() -> Event,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        timer.tick().await;

        loop {
            timer.tick().await;
            if tx.send(make()).is_err() {
                break;
            }
        }
    })
}
