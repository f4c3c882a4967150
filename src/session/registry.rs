//! Registry of sessions known to the arbitration engine
//!
//! Holds every started (or stopped but not yet released) session in
//! activation order, together with the live interrupt relationships between
//! them. Released ids are remembered so they can never start again. The registry itself is not synchronized; the engine owns it behind a
//! single lock.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{AudioSession, InterruptMode, LifecycleState, SessionId};
use crate::policy::Category;

/// Snapshot row describing one registered session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusEntry {
    pub id: SessionId,
    pub category: Category,
    pub interrupt_mode: InterruptMode,
    pub state: LifecycleState,
    /// Time of the most recent successful start
    pub activated_at: DateTime<Utc>,
}

/// Kind of a live interrupt relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Pause,
    Duck,
}

/// `interrupter` is currently pausing or ducking `affected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptRelation {
    pub interrupter: SessionId,
    pub affected: SessionId,
    pub kind: RelationKind,
    /// Category of the interrupter
    pub cause: Category,
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Session {session_id} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub session_id: SessionId,
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Registered sessions and the interrupt relationships between them
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: Vec<FocusEntry>,
    relations: Vec<InterruptRelation>,
    released: HashSet<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: SessionId) -> Option<&FocusEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Current state of a registered session, or `Released` for one that has
    /// left the registry
    pub fn state_of(&self, id: SessionId) -> Option<LifecycleState> {
        self.get(id)
            .map(|entry| entry.state)
            .or_else(|| self.is_released(id).then_some(LifecycleState::Released))
    }

    pub fn is_released(&self, id: SessionId) -> bool {
        self.released.contains(&id)
    }

    /// All registered sessions in activation order
    pub fn entries(&self) -> &[FocusEntry] {
        &self.entries
    }

    /// Sessions that currently take part in arbitration
    pub fn started(&self) -> impl Iterator<Item = &FocusEntry> {
        self.entries.iter().filter(|entry| entry.state.is_started())
    }

    /// Ids of started sessions, for deterministic snapshot comparisons
    pub fn started_ids(&self) -> Vec<SessionId> {
        self.started().map(|entry| entry.id).collect()
    }

    pub fn relations(&self) -> &[InterruptRelation] {
        &self.relations
    }

    /// Register `session` as active, or re-activate it if it was stopped.
    ///
    /// A re-activated session moves to the back of the activation order.
    pub fn activate(&mut self, session: &AudioSession) -> Result<(), InvalidTransition> {
        let id = session.id();
        let index = self.entries.iter().position(|entry| entry.id == id);
        let from = match index {
            Some(i) => self.entries[i].state,
            None if self.is_released(id) => LifecycleState::Released,
            None => LifecycleState::Created,
        };
        if !from.can_transition_to(LifecycleState::Active) {
            return Err(InvalidTransition {
                session_id: id,
                from,
                to: LifecycleState::Active,
            });
        }
        if let Some(i) = index {
            self.entries.remove(i);
        }

        debug!("Registering {} session {} ({} -> active)", session.category(), id, from);
        self.entries.push(FocusEntry {
            id,
            category: session.category(),
            interrupt_mode: session.interrupt_mode(),
            state: LifecycleState::Active,
            activated_at: Utc::now(),
        });
        Ok(())
    }

    /// Move a registered session to `next`, returning the previous state
    pub fn transition(
        &mut self,
        id: SessionId,
        next: LifecycleState,
    ) -> Result<LifecycleState, InvalidTransition> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(InvalidTransition {
                session_id: id,
                from: LifecycleState::Created,
                to: next,
            })?;

        let from = entry.state;
        if !from.can_transition_to(next) {
            return Err(InvalidTransition {
                session_id: id,
                from,
                to: next,
            });
        }

        entry.state = next;
        Ok(from)
    }

    /// Mark `id` released, dropping its entry if it has one
    pub fn release(&mut self, id: SessionId) -> Option<FocusEntry> {
        self.released.insert(id);
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn add_relation(&mut self, relation: InterruptRelation) {
        self.relations.push(relation);
    }

    /// Remove and return every relationship in which `id` is the interrupter
    pub fn take_relations_from(&mut self, id: SessionId) -> Vec<InterruptRelation> {
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .relations
            .drain(..)
            .partition(|relation| relation.interrupter == id);
        self.relations = kept;
        taken
    }

    /// Drop every relationship in which `id` is the affected party
    pub fn drop_relations_on(&mut self, id: SessionId) -> usize {
        let before = self.relations.len();
        self.relations.retain(|relation| relation.affected != id);
        before - self.relations.len()
    }

    pub fn clear_relations(&mut self) {
        self.relations.clear();
    }

    /// Relationships currently affecting `id`
    pub fn relations_on(&self, id: SessionId) -> impl Iterator<Item = &InterruptRelation> {
        self.relations
            .iter()
            .filter(move |relation| relation.affected == id)
    }

    /// Recompute a started session's state from the relationships affecting
    /// it. Pause dominates duck. Returns the change, if any.
    pub fn refresh_state(&mut self, id: SessionId) -> Option<(LifecycleState, LifecycleState)> {
        let current = self.state_of(id)?;
        if !current.is_started() {
            return None;
        }

        let mut desired = LifecycleState::Active;
        for relation in self.relations_on(id) {
            match relation.kind {
                RelationKind::Pause => {
                    desired = LifecycleState::Paused;
                    break;
                }
                RelationKind::Duck => desired = LifecycleState::Ducked,
            }
        }

        if desired == current {
            return None;
        }
        self.transition(id, desired).ok().map(|from| (from, desired))
    }

    /// Other registered SHARED-mode sessions with the same category as `id`
    pub fn shared_peers(&self, id: SessionId) -> Vec<SessionId> {
        let Some(origin) = self.get(id) else {
            return Vec::new();
        };
        if origin.interrupt_mode != InterruptMode::Shared {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| {
                entry.id != id
                    && entry.interrupt_mode == InterruptMode::Shared
                    && entry.category == origin.category
            })
            .map(|entry| entry.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ContentType, StreamUsage};
    use crate::session::SessionDescriptor;

    fn session(id: u64, content: ContentType, usage: StreamUsage) -> AudioSession {
        AudioSession::with_id(SessionId(id), SessionDescriptor::new(content, usage))
    }

    fn music(id: u64) -> AudioSession {
        session(id, ContentType::Music, StreamUsage::Media)
    }

    #[test]
    fn test_activate_and_restart() {
        let mut registry = SessionRegistry::new();
        registry.activate(&music(1)).unwrap();
        registry.activate(&music(2)).unwrap();
        assert_eq!(registry.started_ids(), vec![SessionId(1), SessionId(2)]);

        let err = registry.activate(&music(1)).unwrap_err();
        assert_eq!(err.from, LifecycleState::Active);

        registry
            .transition(SessionId(1), LifecycleState::Stopped)
            .unwrap();
        assert_eq!(registry.started_ids(), vec![SessionId(2)]);

        registry.activate(&music(1)).unwrap();
        assert_eq!(registry.started_ids(), vec![SessionId(2), SessionId(1)]);
    }

    #[test]
    fn test_transition_guards() {
        let mut registry = SessionRegistry::new();
        registry.activate(&music(1)).unwrap();

        assert!(
            registry
                .transition(SessionId(1), LifecycleState::Created)
                .is_err()
        );
        assert!(
            registry
                .transition(SessionId(42), LifecycleState::Stopped)
                .is_err()
        );
        assert_eq!(
            registry.transition(SessionId(1), LifecycleState::Paused),
            Ok(LifecycleState::Active)
        );
    }

    #[test]
    fn test_refresh_state_prefers_pause() {
        let mut registry = SessionRegistry::new();
        registry.activate(&music(1)).unwrap();
        registry.add_relation(InterruptRelation {
            interrupter: SessionId(2),
            affected: SessionId(1),
            kind: RelationKind::Duck,
            cause: Category::Alarm,
        });
        assert_eq!(
            registry.refresh_state(SessionId(1)),
            Some((LifecycleState::Active, LifecycleState::Ducked))
        );

        registry.add_relation(InterruptRelation {
            interrupter: SessionId(3),
            affected: SessionId(1),
            kind: RelationKind::Pause,
            cause: Category::Ringtone,
        });
        registry.refresh_state(SessionId(1));
        assert_eq!(registry.state_of(SessionId(1)), Some(LifecycleState::Paused));

        let taken = registry.take_relations_from(SessionId(3));
        assert_eq!(taken.len(), 1);
        registry.refresh_state(SessionId(1));
        assert_eq!(registry.state_of(SessionId(1)), Some(LifecycleState::Ducked));

        assert_eq!(registry.drop_relations_on(SessionId(1)), 1);
        registry.refresh_state(SessionId(1));
        assert_eq!(registry.state_of(SessionId(1)), Some(LifecycleState::Active));
    }

    #[test]
    fn test_shared_peers_same_category_only() {
        let mut registry = SessionRegistry::new();
        registry
            .activate(&music(1).with_interrupt_mode(InterruptMode::Shared))
            .unwrap();
        registry
            .activate(&music(2).with_interrupt_mode(InterruptMode::Shared))
            .unwrap();
        registry.activate(&music(3)).unwrap();
        registry
            .activate(
                &session(4, ContentType::Music, StreamUsage::Alarm)
                    .with_interrupt_mode(InterruptMode::Shared),
            )
            .unwrap();

        assert_eq!(registry.shared_peers(SessionId(1)), vec![SessionId(2)]);
        assert!(registry.shared_peers(SessionId(3)).is_empty());
        assert!(registry.shared_peers(SessionId(4)).is_empty());

        registry
            .transition(SessionId(2), LifecycleState::Stopped)
            .unwrap();
        assert_eq!(registry.shared_peers(SessionId(1)), vec![SessionId(2)]);
        registry.release(SessionId(2));
        assert!(registry.shared_peers(SessionId(1)).is_empty());
    }

    #[test]
    fn test_release_is_terminal() {
        let mut registry = SessionRegistry::new();
        registry.activate(&music(1)).unwrap();
        assert!(registry.release(SessionId(1)).is_some());
        assert!(registry.release(SessionId(1)).is_none());
        assert!(registry.entries().is_empty());
        assert!(!registry.contains(SessionId(1)));
        assert_eq!(registry.state_of(SessionId(1)), Some(LifecycleState::Released));

        let err = registry.activate(&music(1)).unwrap_err();
        assert_eq!(err.from, LifecycleState::Released);
        assert!(registry.entries().is_empty());
    }
}
