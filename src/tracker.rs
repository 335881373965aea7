//! Per-process state carried across sampling cycles.
//!
//! The tracker owns the pid -> state table. It is written only by the sampling
//! loop; readers receive copied-out `TrackedProcess` batches.

use ahash::AHashMap as HashMap;
use ahash::AHashSet as HashSet;
use std::time::Instant;
use tracing::debug;

use crate::cache::{ProcessSnapshot, TrackedProcess};

/// Start times closer than this are treated as the same process.
const START_TIME_EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct TrackedState {
    arrival_time: f64,
    priority: u8,
    sequence_number: u64,
    start_time_seconds: Option<f64>,
}

/// Seed priority for a cpu reading: `clamp(1, 100, round(cpu*2) + 50)`,
/// plus 20 above 10% cpu.
pub fn base_priority(cpu_percent: f64) -> u8 {
    let cpu = if cpu_percent.is_finite() { cpu_percent } else { 0.0 };
    let mut base = ((cpu * 2.0).round() + 50.0).clamp(1.0, 100.0);
    if cpu > 10.0 {
        base = (base + 20.0).min(100.0);
    }
    base as u8
}

/// Exponential smoothing of a known process's priority.
pub fn blend_priority(old: u8, base: u8) -> u8 {
    (0.7 * old as f64 + 0.3 * base as f64)
        .round()
        .clamp(1.0, 100.0) as u8
}

#[derive(Debug)]
pub struct ProcessStateTracker {
    started: Instant,
    next_sequence: u64,
    states: HashMap<u32, TrackedState>,
}

impl ProcessStateTracker {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            next_sequence: 1,
            states: HashMap::new(),
        }
    }

    /// Annotates `batch` and evicts every pid it does not contain.
    ///
    /// Output order follows the input; the scheduling engine decides the
    /// final display order.
    pub fn update(&mut self, batch: &[ProcessSnapshot], now: Instant) -> Vec<TrackedProcess> {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let mut out = Vec::with_capacity(batch.len());

        for snapshot in batch {
            let base = base_priority(snapshot.cpu_percent);
            let reused = self
                .states
                .get(&snapshot.pid)
                .is_some_and(|state| pid_reused(state.start_time_seconds, snapshot.start_time_seconds));
            if reused {
                debug!("pid {} was reused by a new process, resetting its state", snapshot.pid);
                self.states.remove(&snapshot.pid);
            }

            let state = match self.states.get_mut(&snapshot.pid) {
                Some(state) => {
                    state.priority = blend_priority(state.priority, base);
                    if state.start_time_seconds.is_none() {
                        state.start_time_seconds = snapshot.start_time_seconds;
                    }
                    *state
                }
                None => {
                    let state = TrackedState {
                        arrival_time: elapsed,
                        priority: base,
                        sequence_number: self.next_sequence,
                        start_time_seconds: snapshot.start_time_seconds,
                    };
                    self.next_sequence += 1;
                    self.states.insert(snapshot.pid, state);
                    state
                }
            };

            out.push(TrackedProcess {
                snapshot: snapshot.clone(),
                arrival_time: state.arrival_time,
                priority: state.priority,
                sequence_number: state.sequence_number,
            });
        }

        let present: HashSet<u32> = batch.iter().map(|p| p.pid).collect();
        let before = self.states.len();
        self.states.retain(|pid, _| present.contains(pid));
        let evicted = before - self.states.len();
        if evicted > 0 {
            debug!("Evicted state for {} vanished processes", evicted);
        }

        out
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_tracked(&self, pid: u32) -> bool {
        self.states.contains_key(&pid)
    }

    /// Sequence number the next newly seen process will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}

fn pid_reused(known: Option<f64>, seen: Option<f64>) -> bool {
    match (known, seen) {
        (Some(a), Some(b)) => (a - b).abs() > START_TIME_EPSILON,
        _ => false,
    }
}
