//! Arbitration engine
//!
//! Decides, whenever a session asks to start, which of the already started
//! sessions must stop, pause or duck (or whether the newcomer is refused),
//! applies the resulting lifecycle transitions, and hands the interrupt events
//! to the dispatcher.
//!
//! Every start, stop and release is serialized on the registry lock. Events are
//! delivered after that lock is released but before the next batch can be
//! delivered, so a listener always sees BEGIN before the matching END.

pub mod error;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub use error::{ArbitrationError, SessionRejected};

use crate::config::InterruptConfig;
use crate::interrupt::{
    EventType, HintType, InterruptDispatcher, InterruptEvent, InterruptListener, PendingEvent,
};
use crate::metrics::{ArbitrationMetrics, ArbitrationStats};
use crate::policy::{ArbitrationOutcome, Category, lookup};
use crate::session::{
    AudioSession, FocusEntry, InterruptMode, InterruptRelation, LifecycleState, RelationKind,
    SessionDescriptor, SessionId, SessionRegistry,
};

/// Engine behaviour knobs
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Interrupt mode for sessions created through [`ArbitrationEngine::create_session`]
    pub default_mode: InterruptMode,
    /// Send a one-shot STOP to the listener of a rejected session
    pub notify_rejection: bool,
    /// Volume factor attached to DUCK hints
    pub duck_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&InterruptConfig::default())
    }
}

impl From<&InterruptConfig> for EngineConfig {
    fn from(config: &InterruptConfig) -> Self {
        Self {
            default_mode: config.default_mode,
            notify_rejection: config.notify_rejection,
            duck_volume: config.duck_volume,
        }
    }
}

/// Arbitrates concurrent audio sessions
pub struct ArbitrationEngine {
    /// Engine configuration
    config: EngineConfig,
    /// Registered sessions and interrupt relationships
    registry: Mutex<SessionRegistry>,
    /// Listener slots
    dispatcher: InterruptDispatcher,
    /// Decision counters
    metrics: ArbitrationMetrics,
    /// Next engine-assigned session id
    next_id: AtomicU64,
}

impl ArbitrationEngine {
    /// Create a new ArbitrationEngine
    pub fn new(config: EngineConfig) -> Self {
        info!(
            "Creating arbitration engine (default mode {:?}, notify rejection {}, duck volume {})",
            config.default_mode, config.notify_rejection, config.duck_volume
        );

        Self {
            config,
            registry: Mutex::new(SessionRegistry::new()),
            dispatcher: InterruptDispatcher::new(),
            metrics: ArbitrationMetrics::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a session with an engine-assigned id. The engine does not know
    /// about it until it is started.
    pub fn create_session(&self, descriptor: SessionDescriptor) -> AudioSession {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session =
            AudioSession::with_id(id, descriptor).with_interrupt_mode(self.config.default_mode);
        debug!("Created {} session {}", session.category(), id);
        session
    }

    /// Attach a listener to a session, before or after it starts
    pub fn set_listener<L>(&self, session_id: SessionId, listener: L) -> bool
    where
        L: InterruptListener + 'static,
    {
        self.dispatcher.set_listener(session_id, Arc::new(listener))
    }

    /// Attach an already shared listener
    pub fn set_shared_listener(
        &self,
        session_id: SessionId,
        listener: Arc<dyn InterruptListener>,
    ) -> bool {
        self.dispatcher.set_listener(session_id, listener)
    }

    pub fn remove_listener(&self, session_id: SessionId) -> bool {
        self.dispatcher.remove_listener(session_id)
    }

    /// Ask for `session` to become active.
    ///
    /// Fails with [`ArbitrationError::Rejected`] when any started session has
    /// priority over it; the registry is left untouched in that case.
    pub fn request_start(&self, session: &AudioSession) -> Result<(), ArbitrationError> {
        let id = session.id();
        let category = session.category();
        let mut registry = self.lock_registry();

        if let Some(state) = registry.state_of(id) {
            if state.is_started() || state == LifecycleState::Released {
                warn!("Start of session {} refused while {}", id, state);
                return Err(ArbitrationError::InvalidState {
                    session_id: id,
                    state,
                    operation: "start",
                });
            }
        }

        let decisions: Vec<(SessionId, Category, ArbitrationOutcome)> = registry
            .started()
            .filter(|entry| entry.id != id)
            .map(|entry| (entry.id, entry.category, lookup(entry.category, category)))
            .collect();

        if let Some(&(conflicting_id, conflicting_category, _)) = decisions
            .iter()
            .find(|(_, _, outcome)| *outcome == ArbitrationOutcome::RejectIncoming)
        {
            let rejected = SessionRejected {
                session_id: id,
                category,
                conflicting_id,
                conflicting_category,
            };
            warn!("{}", rejected);
            self.metrics.record_start_rejected(category);

            let delivery = self.dispatcher.begin_delivery();
            drop(registry);
            if self.config.notify_rejection {
                delivery.emit(&PendingEvent::new(
                    id,
                    InterruptEvent::begin(id, HintType::Stop, Some(conflicting_category)),
                ));
            }
            return Err(rejected.into());
        }

        let mut events = Vec::new();
        let mut ducked_by = Vec::new();
        for (existing_id, existing_category, outcome) in decisions {
            debug!(
                "Arbitration {} {} vs incoming {} {}: {}",
                existing_category, existing_id, category, id, outcome
            );
            match outcome {
                outcome if outcome.stops_existing() => {
                    self.stop_locked(&mut registry, existing_id, Some(category), &mut events);
                }
                ArbitrationOutcome::EvictExistingPauseResume => {
                    self.interrupt_locked(
                        &mut registry,
                        InterruptRelation {
                            interrupter: id,
                            affected: existing_id,
                            kind: RelationKind::Pause,
                            cause: category,
                        },
                        &mut events,
                    );
                }
                ArbitrationOutcome::EvictExistingDuckUnduck => {
                    self.interrupt_locked(
                        &mut registry,
                        InterruptRelation {
                            interrupter: id,
                            affected: existing_id,
                            kind: RelationKind::Duck,
                            cause: category,
                        },
                        &mut events,
                    );
                }
                ArbitrationOutcome::EvictIncomingDuckUnduck => {
                    ducked_by.push((existing_id, existing_category));
                }
                // None leaves both playing; rejections returned above
                _ => {}
            }
        }

        if let Err(err) = registry.activate(session) {
            return Err(ArbitrationError::invalid_transition(err, "start"));
        }
        self.metrics.record_start_granted(category);

        for (existing_id, existing_category) in ducked_by {
            self.interrupt_locked(
                &mut registry,
                InterruptRelation {
                    interrupter: existing_id,
                    affected: id,
                    kind: RelationKind::Duck,
                    cause: existing_category,
                },
                &mut events,
            );
        }

        info!(
            "Session {} ({}) started as {}",
            id,
            category,
            registry.state_of(id).unwrap_or(LifecycleState::Active)
        );
        self.deliver(registry, events);
        Ok(())
    }

    /// Stop a started session at the caller's request.
    ///
    /// Sessions it was pausing or ducking get their END events. The stopped
    /// session itself is not notified.
    pub fn stop(&self, session_id: SessionId) -> Result<(), ArbitrationError> {
        let mut registry = self.lock_registry();
        let state = registry
            .state_of(session_id)
            .ok_or(ArbitrationError::UnknownSession(session_id))?;
        if !state.is_started() {
            warn!("Stop of session {} refused, currently {}", session_id, state);
            return Err(ArbitrationError::InvalidState {
                session_id,
                state,
                operation: "stop",
            });
        }

        let mut events = Vec::new();
        self.stop_locked(&mut registry, session_id, None, &mut events);
        info!("Session {} stopped by caller", session_id);
        self.deliver(registry, events);
        Ok(())
    }

    /// Release a session. Idempotent: unknown or already released sessions are
    /// ignored and produce no events.
    pub fn release(&self, session_id: SessionId) {
        let mut registry = self.lock_registry();

        if !registry.contains(session_id) {
            registry.release(session_id);
            drop(registry);
            self.dispatcher.remove_listener(session_id);
            debug!("Session {} released without being registered", session_id);
            return;
        }

        let mut events = Vec::new();
        self.end_interrupts_from(&mut registry, session_id, &mut events);
        registry.drop_relations_on(session_id);

        let previous = registry
            .transition(session_id, LifecycleState::Released)
            .unwrap_or(LifecycleState::Released);
        registry.release(session_id);
        self.dispatcher.remove_listener(session_id);
        self.metrics.record_release();

        info!("Session {} released (was {})", session_id, previous);
        self.deliver(registry, events);
    }

    /// Stop every started session, as on an account switch. Returns how many
    /// sessions were stopped.
    pub fn clear_focus_list(&self) -> usize {
        let mut registry = self.lock_registry();
        registry.clear_relations();

        let started: Vec<(SessionId, Category)> = registry
            .started()
            .map(|entry| (entry.id, entry.category))
            .collect();

        let mut events = Vec::new();
        for (id, category) in started {
            if registry.transition(id, LifecycleState::Stopped).is_ok() {
                self.metrics.record_stop(category);
                events.push(PendingEvent::new(
                    id,
                    InterruptEvent::begin(id, HintType::Stop, None),
                ));
            }
        }

        let stopped = events.len();
        info!("Focus list cleared, {} sessions stopped", stopped);
        self.deliver(registry, events);
        stopped
    }

    /// Registered sessions in activation order
    pub fn focus_list(&self) -> Vec<FocusEntry> {
        self.lock_registry().entries().to_vec()
    }

    /// Ids of sessions currently taking part in arbitration
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.lock_registry().started_ids()
    }

    /// Lifecycle state of a session; `None` if it was never started nor
    /// released
    pub fn session_state(&self, session_id: SessionId) -> Option<LifecycleState> {
        self.lock_registry().state_of(session_id)
    }

    /// Highest-priority category among sessions playing unattenuated
    pub fn category_in_focus(&self) -> Option<Category> {
        self.lock_registry()
            .started()
            .filter(|entry| entry.state == LifecycleState::Active)
            .map(|entry| entry.category)
            .max_by_key(|category| category.focus_priority())
    }

    /// Live interrupt relationships
    pub fn relations(&self) -> Vec<InterruptRelation> {
        self.lock_registry().relations().to_vec()
    }

    pub fn stats(&self) -> ArbitrationStats {
        self.metrics.snapshot()
    }

    fn lock_registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move a started session to STOPPED. With a cause, the session receives a
    /// BEGIN(STOP); relationships it took part in are cleared.
    fn stop_locked(
        &self,
        registry: &mut SessionRegistry,
        session_id: SessionId,
        cause: Option<Category>,
        events: &mut Vec<PendingEvent>,
    ) {
        let Some(category) = registry.get(session_id).map(|entry| entry.category) else {
            return;
        };
        if let Err(err) = registry.transition(session_id, LifecycleState::Stopped) {
            warn!("Skipping stop: {}", err);
            return;
        }
        self.metrics.record_stop(category);

        if let Some(cause) = cause {
            debug!("Session {} stopped by incoming {}", session_id, cause);
            events.push(PendingEvent::new(
                session_id,
                InterruptEvent::begin(session_id, HintType::Stop, Some(cause)),
            ));
        }

        self.end_interrupts_from(registry, session_id, events);
        registry.drop_relations_on(session_id);
    }

    /// Record a pause or duck relationship and notify the affected session
    fn interrupt_locked(
        &self,
        registry: &mut SessionRegistry,
        relation: InterruptRelation,
        events: &mut Vec<PendingEvent>,
    ) {
        let Some(affected_category) = registry.get(relation.affected).map(|entry| entry.category)
        else {
            return;
        };

        let event = match relation.kind {
            RelationKind::Pause => {
                self.metrics.record_pause(affected_category);
                InterruptEvent::begin(relation.affected, HintType::Pause, Some(relation.cause))
            }
            RelationKind::Duck => {
                self.metrics.record_duck(affected_category);
                InterruptEvent::begin(relation.affected, HintType::Duck, Some(relation.cause))
                    .with_duck_volume(self.config.duck_volume)
            }
        };

        registry.add_relation(relation);
        if let Some((from, to)) = registry.refresh_state(relation.affected) {
            debug!("Session {} {} -> {}", relation.affected, from, to);
        }
        events.push(PendingEvent::new(relation.affected, event));
    }

    /// Clear relationships in which `session_id` is the interrupter, sending
    /// the matching END to sessions that are still started
    fn end_interrupts_from(
        &self,
        registry: &mut SessionRegistry,
        session_id: SessionId,
        events: &mut Vec<PendingEvent>,
    ) {
        for relation in registry.take_relations_from(session_id) {
            let still_started = registry
                .state_of(relation.affected)
                .is_some_and(LifecycleState::is_started);
            if !still_started {
                continue;
            }

            let hint = match relation.kind {
                RelationKind::Pause => HintType::Resume,
                RelationKind::Duck => HintType::Unduck,
            };
            if let Some((from, to)) = registry.refresh_state(relation.affected) {
                debug!("Session {} {} -> {}", relation.affected, from, to);
            }
            events.push(PendingEvent::new(
                relation.affected,
                InterruptEvent::end(relation.affected, hint, Some(relation.cause)),
            ));
        }
    }

    /// Fan events out to SHARED peers, release the registry lock and deliver.
    /// A peer gets a copy only if it is not already addressed by an identical
    /// hint in the same batch.
    fn deliver(&self, registry: MutexGuard<'_, SessionRegistry>, events: Vec<PendingEvent>) {
        let mut addressed: HashSet<(SessionId, EventType, HintType)> = events
            .iter()
            .map(|pending| (pending.target, pending.event.event_type, pending.event.hint))
            .collect();

        let mut batch = Vec::with_capacity(events.len());
        for pending in events {
            let peers = registry.shared_peers(pending.target);
            let event = pending.event.clone();
            batch.push(pending);
            for peer in peers {
                if addressed.insert((peer, event.event_type, event.hint)) {
                    batch.push(PendingEvent::new(peer, event.clone()));
                }
            }
        }

        let delivery = self.dispatcher.begin_delivery();
        drop(registry);
        let delivered = delivery.emit_all(&batch);
        if !batch.is_empty() {
            debug!("Delivered {}/{} interrupt events", delivered, batch.len());
        }
    }
}

impl Default for ArbitrationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
