//! Audio session model
//!
//! This module provides session identity and attributes, the lifecycle state
//! machine, and the registry the arbitration engine keeps of started sessions.

pub mod registry;
pub mod types;

pub use registry::{FocusEntry, InterruptRelation, InvalidTransition, RelationKind, SessionRegistry};
pub use types::{AudioSession, InterruptMode, LifecycleState, SessionDescriptor, SessionId};
