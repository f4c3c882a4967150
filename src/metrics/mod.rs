//! Arbitration metrics
//!
//! Counts arbitration decisions both through the `metrics` facade (picked up
//! by whatever recorder the host installs) and in-process for snapshots.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::policy::Category;

/// Snapshot of arbitration counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArbitrationStats {
    pub starts_granted: u64,
    pub starts_rejected: u64,
    pub stops: u64,
    pub pauses: u64,
    pub ducks: u64,
    pub releases: u64,
}

/// Counters updated by the engine
#[derive(Debug, Default)]
pub struct ArbitrationMetrics {
    starts_granted: AtomicU64,
    starts_rejected: AtomicU64,
    stops: AtomicU64,
    pauses: AtomicU64,
    ducks: AtomicU64,
    releases: AtomicU64,
}

impl ArbitrationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start_granted(&self, category: Category) {
        self.starts_granted.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_starts_granted_total", "category" => category.as_str());
    }

    pub fn record_start_rejected(&self, category: Category) {
        self.starts_rejected.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_starts_rejected_total", "category" => category.as_str());
    }

    pub fn record_stop(&self, category: Category) {
        self.stops.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_stops_total", "category" => category.as_str());
    }

    pub fn record_pause(&self, category: Category) {
        self.pauses.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_pauses_total", "category" => category.as_str());
    }

    pub fn record_duck(&self, category: Category) {
        self.ducks.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_ducks_total", "category" => category.as_str());
    }

    pub fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        metrics::increment_counter!("audio_arbiter_releases_total");
    }

    pub fn snapshot(&self) -> ArbitrationStats {
        ArbitrationStats {
            starts_granted: self.starts_granted.load(Ordering::Relaxed),
            starts_rejected: self.starts_rejected.load(Ordering::Relaxed),
            stops: self.stops.load(Ordering::Relaxed),
            pauses: self.pauses.load(Ordering::Relaxed),
            ducks: self.ducks.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = ArbitrationMetrics::new();

        metrics.record_start_granted(Category::Music);
        metrics.record_start_granted(Category::Alarm);
        metrics.record_start_rejected(Category::VoiceCall);
        metrics.record_duck(Category::Music);
        metrics.record_release();

        let stats = metrics.snapshot();
        assert_eq!(stats.starts_granted, 2);
        assert_eq!(stats.starts_rejected, 1);
        assert_eq!(stats.ducks, 1);
        assert_eq!(stats.pauses, 0);
        assert_eq!(stats.releases, 1);
        assert_eq!(ArbitrationMetrics::new().snapshot(), ArbitrationStats::default());
    }
}
