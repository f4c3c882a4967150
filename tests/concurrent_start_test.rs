//! Concurrent start/release tests for the arbitration engine

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use audio_arbiter::{
    ArbitrationEngine, Category, ContentType, EventType, HintType, InterruptChannel,
    InterruptEvent, SessionDescriptor, SessionId, StreamUsage,
};

fn voice_call() -> SessionDescriptor {
    SessionDescriptor::new(ContentType::Speech, StreamUsage::VoiceCommunication)
}

fn music() -> SessionDescriptor {
    SessionDescriptor::new(ContentType::Music, StreamUsage::Media)
}

fn ringtone() -> SessionDescriptor {
    SessionDescriptor::new(ContentType::Music, StreamUsage::NotificationRingtone)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_voice_calls_single_winner() -> Result<()> {
    const CALLERS: usize = 16;
    let engine = Arc::new(ArbitrationEngine::default());

    let mut handles = Vec::with_capacity(CALLERS);
    for _ in 0..CALLERS {
        let engine = Arc::clone(&engine);
        handles.push(tokio::task::spawn_blocking(move || {
            let session = engine.create_session(voice_call());
            engine.request_start(&session).map(|()| session.id())
        }));
    }

    let mut winners = Vec::new();
    let mut rejected = 0;
    for handle in handles {
        match handle.await? {
            Ok(id) => winners.push(id),
            Err(err) => {
                assert!(err.is_rejection(), "unexpected error: {}", err);
                rejected += 1;
            }
        }
    }

    assert_eq!(winners.len(), 1, "exactly one call should win");
    assert_eq!(rejected, CALLERS - 1);
    assert_eq!(engine.active_sessions(), winners);
    assert_eq!(engine.category_in_focus(), Some(Category::VoiceCall));

    let stats = engine.stats();
    assert_eq!(stats.starts_granted, 1);
    assert_eq!(stats.starts_rejected as usize, CALLERS - 1);

    Ok(())
}

/// Each listener must see every END after the BEGIN it closes
fn assert_paired(session_id: SessionId, events: &[InterruptEvent]) {
    let mut open: HashMap<HintType, i64> = HashMap::new();
    for event in events {
        match event.event_type {
            EventType::Begin => {
                if let Some(end) = event.hint.complement() {
                    *open.entry(end).or_default() += 1;
                }
            }
            EventType::End => {
                let count = open.entry(event.hint).or_default();
                *count -= 1;
                assert!(
                    *count >= 0,
                    "session {} saw {:?} before its BEGIN: {:?}",
                    session_id,
                    event.hint,
                    events
                );
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_release_keeps_event_order() -> Result<()> {
    const ROUNDS: usize = 24;
    let engine = Arc::new(ArbitrationEngine::default());

    let mut channels = Vec::with_capacity(ROUNDS);
    let mut handles = Vec::with_capacity(ROUNDS);
    for round in 0..ROUNDS {
        let descriptor = if round % 3 == 0 { ringtone() } else { music() };
        let session = engine.create_session(descriptor);
        let channel = InterruptChannel::new();
        engine.set_listener(session.id(), channel.listener());
        channels.push((session.id(), channel));

        let engine = Arc::clone(&engine);
        handles.push(tokio::task::spawn_blocking(move || {
            if engine.request_start(&session).is_ok() {
                std::thread::yield_now();
                engine.release(session.id());
            }
        }));
    }

    let joined = timeout(Duration::from_secs(10), async {
        for handle in handles {
            handle.await?;
        }
        Ok::<_, tokio::task::JoinError>(())
    })
    .await;
    assert!(joined.is_ok(), "all workers should finish within 10 seconds");
    joined??;

    assert!(engine.active_sessions().is_empty());
    assert!(engine.relations().is_empty());

    for (session_id, mut channel) in channels {
        let events = channel.drain();
        assert_paired(session_id, &events);
    }

    Ok(())
}
