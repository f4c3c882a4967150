//! Session identity, attributes and lifecycle state machine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::policy::{Category, ContentType, StreamUsage, classify};

/// Unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Scope of events a session listener observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptMode {
    /// Only events about the session itself
    #[default]
    Independent,
    /// Also events about other shared sessions of the same category
    Shared,
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Created,
    Active,
    Ducked,
    Paused,
    Stopped,
    Released,
}

impl LifecycleState {
    /// Whether the session currently takes part in arbitration
    pub const fn is_started(self) -> bool {
        matches!(
            self,
            LifecycleState::Active | LifecycleState::Ducked | LifecycleState::Paused
        )
    }

    /// Whether the state machine permits moving to `next`
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, next) {
            (Released, _) => false,
            (_, Released) => true,
            (Created | Stopped, Active) => true,
            (Active, Ducked | Paused | Stopped) => true,
            (Ducked, Active | Paused | Stopped) => true,
            (Paused, Active | Ducked | Stopped) => true,
            _ => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Created => "created",
            LifecycleState::Active => "active",
            LifecycleState::Ducked => "ducked",
            LifecycleState::Paused => "paused",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Released => "released",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream attributes supplied by the creator of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub content_type: ContentType,
    pub stream_usage: StreamUsage,
}

impl SessionDescriptor {
    pub fn new(content_type: ContentType, stream_usage: StreamUsage) -> Self {
        Self {
            content_type,
            stream_usage,
        }
    }

    pub fn category(&self) -> Category {
        classify(self.content_type, self.stream_usage)
    }
}

/// Caller-side handle for a session that may or may not be started yet
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSession {
    id: SessionId,
    descriptor: SessionDescriptor,
    category: Category,
    interrupt_mode: InterruptMode,
}

impl AudioSession {
    /// Create a session with a caller-assigned id
    pub fn with_id(id: SessionId, descriptor: SessionDescriptor) -> Self {
        Self {
            id,
            descriptor,
            category: descriptor.category(),
            interrupt_mode: InterruptMode::default(),
        }
    }

    pub fn with_interrupt_mode(mut self, mode: InterruptMode) -> Self {
        self.interrupt_mode = mode;
        self
    }

    pub fn set_interrupt_mode(&mut self, mode: InterruptMode) {
        self.interrupt_mode = mode;
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn descriptor(&self) -> SessionDescriptor {
        self.descriptor
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn interrupt_mode(&self) -> InterruptMode {
        self.interrupt_mode
    }
}
