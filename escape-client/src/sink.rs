//! Presentation sinks.
//!
//! The session loop hands every [`SessionEvent`] to a [`PresentationSink`].
//! Rendering, input widgets and page navigation live behind this trait.

use escape_core::SessionEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Receiver of presentation events.
///
/// Called from the session loop; implementations must not block.
pub trait PresentationSink: Send + 'static {
    /// Present one event.
    fn present(&mut self, event: &SessionEvent);
}

impl<F> PresentationSink for F
where
    F: FnMut(&SessionEvent) + Send + 'static,
{
    fn present(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PresentationSink for ChannelSink {
    fn present(&mut self, event: &SessionEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::debug!("presentation receiver dropped");
        }
    }
}

/// Records events for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything presented so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count the events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }

    /// Target of the last navigation, if any.
    pub fn navigated_to(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            SessionEvent::Navigate { target } => Some(target),
            _ => None,
        })
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_shares_events_between_clones() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.present(&SessionEvent::ClearInput);
        writer.present(&SessionEvent::Navigate {
            target: "/result".into(),
        });

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.navigated_to().as_deref(), Some("/result"));
        assert_eq!(
            sink.count(|e| matches!(e, SessionEvent::ClearInput)),
            1
        );
    }

    #[tokio::test]
    async fn channel_sink_forwards_events() {
        let (mut sink, mut rx) = ChannelSink::new();
        sink.present(&SessionEvent::InputRejected);
        assert_eq!(rx.recv().await, Some(SessionEvent::InputRejected));
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);
        sink.present(&SessionEvent::ClearInput);
    }

    #[test]
    fn closures_are_sinks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut sink = move |_: &SessionEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        sink.present(&SessionEvent::ClearInput);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
