//! Channel-backed listener for asynchronous event consumption

use tokio::sync::mpsc;
use tracing::debug;

use super::{InterruptEvent, InterruptListener};

/// Listener that forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    event_tx: mpsc::UnboundedSender<InterruptEvent>,
}

impl ChannelListener {
    pub fn new(event_tx: mpsc::UnboundedSender<InterruptEvent>) -> Self {
        Self { event_tx }
    }

    /// Check if the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

impl InterruptListener for ChannelListener {
    fn on_interrupt(&self, event: &InterruptEvent) {
        if self.event_tx.send(event.clone()).is_err() {
            debug!(
                "Interrupt receiver for session {} dropped, discarding event",
                event.session_id
            );
        }
    }
}

/// Channel pairing a listener with the receiver that observes it
pub struct InterruptChannel {
    /// Event sender
    event_tx: mpsc::UnboundedSender<InterruptEvent>,
    /// Event receiver
    event_rx: Option<mpsc::UnboundedReceiver<InterruptEvent>>,
}

impl InterruptChannel {
    /// Create a new InterruptChannel
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Listener to register with the engine
    pub fn listener(&self) -> ChannelListener {
        ChannelListener::new(self.event_tx.clone())
    }

    /// Wait for the next event
    pub async fn next_event(&mut self) -> Option<InterruptEvent> {
        if let Some(event_rx) = &mut self.event_rx {
            event_rx.recv().await
        } else {
            None
        }
    }

    /// Take the next event if one is already queued
    pub fn try_next_event(&mut self) -> Option<InterruptEvent> {
        self.event_rx
            .as_mut()
            .and_then(|event_rx| event_rx.try_recv().ok())
    }

    /// Take every queued event
    pub fn drain(&mut self) -> Vec<InterruptEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_next_event() {
            events.push(event);
        }
        events
    }

    /// Hand the receiver to another owner
    pub fn event_rx(&mut self) -> Option<mpsc::UnboundedReceiver<InterruptEvent>> {
        self.event_rx.take()
    }
}

impl Default for InterruptChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::HintType;
    use crate::session::SessionId;

    #[tokio::test]
    async fn test_channel_forwards_events() {
        let mut channel = InterruptChannel::new();
        let listener = channel.listener();

        listener.on_interrupt(&InterruptEvent::begin(SessionId(1), HintType::Pause, None));
        listener.on_interrupt(&InterruptEvent::end(SessionId(1), HintType::Resume, None));

        let first = channel.next_event().await.unwrap();
        assert_eq!(first.hint, HintType::Pause);
        let rest = channel.drain();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].hint, HintType::Resume);
        assert!(channel.try_next_event().is_none());
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let mut channel = InterruptChannel::new();
        let listener = channel.listener();
        drop(channel.event_rx());

        assert!(listener.is_closed());
        listener.on_interrupt(&InterruptEvent::begin(SessionId(2), HintType::Stop, None));
    }
}
