//! Process snapshot types and the short-lived acquisition cache.
//!
//! This module provides the `ProcessSnapshot` record produced by one acquisition,
//! the `TrackedProcess` record carrying per-process state attached by the tracker,
//! and the `AcquisitionCache` that bounds cost under frequent polling.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// One row of the host process table as seen by a single acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    /// Executable path; empty when the host does not expose it.
    #[serde(default)]
    pub exe: String,
    pub memory_mb: f64,
    /// May transiently exceed 100 on multi-core hosts.
    pub cpu_percent: f64,
    /// Process start time in seconds since boot, when the host exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_seconds: Option<f64>,
}

impl ProcessSnapshot {
    /// Reduced-fidelity record used when full enumeration is unavailable.
    pub fn basic(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            exe: String::new(),
            memory_mb: 0.0,
            cpu_percent: 0.0,
            start_time_seconds: None,
        }
    }
}

/// A snapshot annotated with the tracker's per-process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedProcess {
    #[serde(flatten)]
    pub snapshot: ProcessSnapshot,
    /// Seconds since engine start when the pid was first observed.
    pub arrival_time: f64,
    /// Smoothed priority in [1, 100].
    pub priority: u8,
    pub sequence_number: u64,
}

impl TrackedProcess {
    pub fn pid(&self) -> u32 {
        self.snapshot.pid
    }

    pub fn cpu_percent(&self) -> f64 {
        self.snapshot.cpu_percent
    }
}

/// Parameters that key a cached acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionKey {
    pub max_count: usize,
    pub apps_only: bool,
}

/// Last acquisition result with its parameters and timestamp.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionCache {
    entry: Option<CachedAcquisition>,
}

#[derive(Debug, Clone)]
struct CachedAcquisition {
    key: AcquisitionKey,
    taken_at: Instant,
    processes: Vec<ProcessSnapshot>,
    degraded: bool,
}

impl AcquisitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result when it was taken with the same parameters
    /// less than `ttl` before `now`.
    pub fn lookup(
        &self,
        key: AcquisitionKey,
        now: Instant,
        ttl: Duration,
    ) -> Option<(&[ProcessSnapshot], bool)> {
        let entry = self.entry.as_ref()?;
        if entry.key != key {
            return None;
        }
        if now.saturating_duration_since(entry.taken_at) >= ttl {
            return None;
        }
        Some((entry.processes.as_slice(), entry.degraded))
    }

    pub fn store(
        &mut self,
        key: AcquisitionKey,
        taken_at: Instant,
        processes: Vec<ProcessSnapshot>,
        degraded: bool,
    ) {
        self.entry = Some(CachedAcquisition {
            key,
            taken_at,
            processes,
            degraded,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
