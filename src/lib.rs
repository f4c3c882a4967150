//! Audio Arbiter Library
//!
//! An audio session interrupt arbitration engine: classifies concurrent
//! playback sessions, decides from a fixed priority table which of them stop,
//! pause, duck or get refused, and notifies each session's listener.

pub mod cli;
pub mod config;
pub mod engine;
pub mod interrupt;
pub mod metrics;
pub mod policy;
pub mod session;

use anyhow::{Context, Result};
use std::path::Path;

pub use engine::{ArbitrationEngine, ArbitrationError, EngineConfig, SessionRejected};
pub use interrupt::{EventType, HintType, InterruptChannel, InterruptEvent, InterruptListener};
pub use policy::{ArbitrationOutcome, Category, ContentType, StreamUsage, classify, lookup};
pub use session::{AudioSession, InterruptMode, LifecycleState, SessionDescriptor, SessionId};

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize tracing subscriber for logging
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("audio_arbiter={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Initialize tracing with a non-blocking file writer.
///
/// The returned guard flushes pending lines when dropped and must be kept alive
/// for as long as the process logs.
pub fn init_file_logging<P: AsRef<Path>>(
    level: &str,
    path: P,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let path = path.as_ref();
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", path.display()))?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("audio_arbiter={}", level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
