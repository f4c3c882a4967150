//! Interrupt events and their delivery to session listeners
//!
//! This module defines the event payload handed to listeners, the listener
//! contract itself, and the dispatcher that routes events to per-session
//! listener slots.

pub mod channel;
pub mod dispatcher;

use serde::{Deserialize, Serialize};

use crate::policy::Category;
use crate::session::SessionId;

pub use channel::{ChannelListener, InterruptChannel};
pub use dispatcher::{Delivery, InterruptDispatcher, PendingEvent};

/// Whether an event opens or closes an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Begin,
    End,
}

/// What the receiving session is expected to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintType {
    None,
    Pause,
    Resume,
    Stop,
    Duck,
    Unduck,
}

impl HintType {
    /// END hint that closes a BEGIN with this hint, if the hint is paired
    pub const fn complement(self) -> Option<HintType> {
        match self {
            HintType::Pause => Some(HintType::Resume),
            HintType::Duck => Some(HintType::Unduck),
            _ => None,
        }
    }
}

/// Notification delivered to a session listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptEvent {
    /// Session the event concerns
    pub session_id: SessionId,
    pub event_type: EventType,
    pub hint: HintType,
    /// Category of the session that caused the interrupt
    pub cause: Option<Category>,
    /// Target volume factor, set on DUCK hints
    pub duck_volume: Option<f32>,
}

impl InterruptEvent {
    pub fn begin(session_id: SessionId, hint: HintType, cause: Option<Category>) -> Self {
        Self {
            session_id,
            event_type: EventType::Begin,
            hint,
            cause,
            duck_volume: None,
        }
    }

    pub fn end(session_id: SessionId, hint: HintType, cause: Option<Category>) -> Self {
        Self {
            session_id,
            event_type: EventType::End,
            hint,
            cause,
            duck_volume: None,
        }
    }

    pub fn with_duck_volume(mut self, volume: f32) -> Self {
        self.duck_volume = Some(volume);
        self
    }

    pub fn is_stop(&self) -> bool {
        self.hint == HintType::Stop
    }
}

/// Receiver of interrupt events for one session.
///
/// Called from whichever thread committed the triggering start, stop or
/// release. Implementations must not call back into the engine synchronously;
/// forward through a [`ChannelListener`] instead.
pub trait InterruptListener: Send + Sync {
    fn on_interrupt(&self, event: &InterruptEvent);
}

impl<F> InterruptListener for F
where
    F: Fn(&InterruptEvent) + Send + Sync,
{
    fn on_interrupt(&self, event: &InterruptEvent) {
        self(event)
    }
}
