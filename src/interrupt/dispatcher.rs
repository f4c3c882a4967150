//! Per-session listener slots and ordered event delivery

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use super::{InterruptEvent, InterruptListener};
use crate::session::SessionId;

/// Event addressed to a listener slot
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    /// Listener slot the event is delivered to
    pub target: SessionId,
    pub event: InterruptEvent,
}

impl PendingEvent {
    pub fn new(target: SessionId, event: InterruptEvent) -> Self {
        Self { target, event }
    }
}

/// Routes interrupt events to the listener registered for each session.
///
/// Events for a session without a listener are dropped; nothing is queued for
/// listeners attached later.
pub struct InterruptDispatcher {
    listeners: Mutex<HashMap<SessionId, Arc<dyn InterruptListener>>>,
    /// Held for the duration of one batch so batches land in commit order
    delivery_order: Mutex<()>,
}

impl InterruptDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            delivery_order: Mutex::new(()),
        }
    }

    /// Attach a listener, replacing any previous one. Returns true if a
    /// listener was replaced.
    pub fn set_listener(&self, session_id: SessionId, listener: Arc<dyn InterruptListener>) -> bool {
        let replaced = self.slots().insert(session_id, listener).is_some();
        debug!(
            "Listener {} for session {}",
            if replaced { "replaced" } else { "attached" },
            session_id
        );
        replaced
    }

    /// Detach a listener. Returns true if one was registered.
    pub fn remove_listener(&self, session_id: SessionId) -> bool {
        self.slots().remove(&session_id).is_some()
    }

    /// Deliver a single event outside of any engine batch
    pub fn emit(&self, target: SessionId, event: InterruptEvent) -> bool {
        self.begin_delivery().emit(&PendingEvent::new(target, event))
    }

    /// Reserve the delivery order for one batch of events.
    ///
    /// The engine takes this before releasing its registry lock so that a later
    /// batch cannot overtake an earlier one.
    pub fn begin_delivery(&self) -> Delivery<'_> {
        Delivery {
            dispatcher: self,
            _order: self
                .delivery_order
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn listener_for(&self, session_id: SessionId) -> Option<Arc<dyn InterruptListener>> {
        self.slots().get(&session_id).cloned()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<dyn InterruptListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InterruptDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive delivery window for one batch of events
pub struct Delivery<'a> {
    dispatcher: &'a InterruptDispatcher,
    _order: MutexGuard<'a, ()>,
}

impl Delivery<'_> {
    /// Deliver one event. Returns false if the target has no listener.
    pub fn emit(&self, pending: &PendingEvent) -> bool {
        match self.dispatcher.listener_for(pending.target) {
            Some(listener) => {
                trace!(
                    "Delivering {:?}/{:?} for session {} to listener of {}",
                    pending.event.event_type, pending.event.hint, pending.event.session_id, pending.target
                );
                listener.on_interrupt(&pending.event);
                true
            }
            None => {
                debug!(
                    "No listener for session {}, dropping {:?}/{:?}",
                    pending.target, pending.event.event_type, pending.event.hint
                );
                false
            }
        }
    }

    /// Deliver a batch in order, returning how many events reached a listener
    pub fn emit_all(self, events: &[PendingEvent]) -> usize {
        events.iter().filter(|pending| self.emit(pending)).count()
    }
}
