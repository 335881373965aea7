//! Application state shared between the sampling loop and its consumers.
//!
//! Everything here is either immutable after construction, atomic, or a
//! `watch` channel carrying fully built, immutable values. Consumers never
//! see a partially published batch.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Notify};

use crate::cache::TrackedProcess;
use crate::config::Config;
use crate::health_stats::SamplerStats;
use crate::scheduler::{SchedulingEngine, SchedulingPolicy};
use crate::system::ResourceSummary;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// One annotated, ordered batch as handed to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedBatch {
    /// Increments by one per published batch.
    pub sequence: u64,
    pub generated_at: DateTime<Utc>,
    /// Policy the `processes` order was produced with.
    pub policy: SchedulingPolicy,
    pub processes: Vec<TrackedProcess>,
    /// Built from the pid+name fallback listing.
    pub degraded: bool,
    /// Enumeration has failed for too many consecutive cycles.
    pub stale: bool,
    pub from_cache: bool,
}

pub struct AppState {
    pub config: Arc<Config>,
    pub engine: SchedulingEngine,
    pub stats: Arc<SamplerStats>,
    /// Force-refresh signal; pending signals coalesce into one extra cycle.
    pub refresh: Notify,
    pub apps_only: AtomicBool,
    pub max_processes: AtomicUsize,
    pub batches: watch::Sender<Option<Arc<PublishedBatch>>>,
    pub summaries: watch::Sender<Option<Arc<ResourceSummary>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, stats: Arc<SamplerStats>, start_time: Instant) -> Self {
        let (batches, _) = watch::channel(None);
        let (summaries, _) = watch::channel(None);
        Self {
            engine: SchedulingEngine::new(config.policy(), config.time_quantum_ms(), start_time),
            apps_only: AtomicBool::new(config.apps_only()),
            max_processes: AtomicUsize::new(config.max_processes()),
            config,
            stats,
            refresh: Notify::new(),
            batches,
            summaries,
            start_time,
        }
    }

    pub fn apps_only(&self) -> bool {
        self.apps_only.load(Ordering::Relaxed)
    }

    pub fn max_processes(&self) -> usize {
        self.max_processes.load(Ordering::Relaxed)
    }

    pub fn latest_batch(&self) -> Option<Arc<PublishedBatch>> {
        self.batches.borrow().clone()
    }

    pub fn latest_summary(&self) -> Option<Arc<ResourceSummary>> {
        self.summaries.borrow().clone()
    }
}
