//! Scheduling-policy engine.
//!
//! Orders a tracked batch under one of five classical CPU-scheduling
//! disciplines. The ordering is purely a visualization; nothing here touches
//! real OS scheduling. Every policy is a stable sort, so ties keep input order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use crate::cache::TrackedProcess;

/// CPU percent above which a process lands in the system queue.
pub const SYSTEM_QUEUE_CPU_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingPolicy {
    Fcfs,
    Sjf,
    Priority,
    #[serde(alias = "rr")]
    RoundRobin,
    #[serde(alias = "mlq")]
    MultilevelQueue,
}

struct PolicyInfo {
    policy: SchedulingPolicy,
    key: &'static str,
    name: &'static str,
    description: &'static str,
}

static POLICY_TABLE: [PolicyInfo; 5] = [
    PolicyInfo {
        policy: SchedulingPolicy::Fcfs,
        key: "fcfs",
        name: "First Come First Served",
        description: "Processes execute in order of arrival",
    },
    PolicyInfo {
        policy: SchedulingPolicy::Sjf,
        key: "sjf",
        name: "Shortest Job First",
        description: "Shortest jobs (lowest CPU usage) execute first",
    },
    PolicyInfo {
        policy: SchedulingPolicy::Priority,
        key: "priority",
        name: "Priority",
        description: "Higher priority processes (higher CPU) execute first",
    },
    PolicyInfo {
        policy: SchedulingPolicy::RoundRobin,
        key: "round_robin",
        name: "Round Robin",
        description: "Processes execute in time slices (quantum-based)",
    },
    PolicyInfo {
        policy: SchedulingPolicy::MultilevelQueue,
        key: "multilevel_queue",
        name: "Multilevel Queue Scheduling",
        description: "System and user processes in separate queues",
    },
];

impl SchedulingPolicy {
    pub const ALL: [SchedulingPolicy; 5] = [
        SchedulingPolicy::Fcfs,
        SchedulingPolicy::Sjf,
        SchedulingPolicy::Priority,
        SchedulingPolicy::RoundRobin,
        SchedulingPolicy::MultilevelQueue,
    ];

    fn info(self) -> &'static PolicyInfo {
        &POLICY_TABLE[self.index() as usize]
    }

    fn index(self) -> u8 {
        match self {
            SchedulingPolicy::Fcfs => 0,
            SchedulingPolicy::Sjf => 1,
            SchedulingPolicy::Priority => 2,
            SchedulingPolicy::RoundRobin => 3,
            SchedulingPolicy::MultilevelQueue => 4,
        }
    }

    fn from_index(index: u8) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(SchedulingPolicy::RoundRobin)
    }

    /// Short identifier used in config files and on the command line.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn description(self) -> &'static str {
        self.info().description
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SchedulingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "rr" => return Ok(SchedulingPolicy::RoundRobin),
            "mlq" => return Ok(SchedulingPolicy::MultilevelQueue),
            _ => {}
        }
        POLICY_TABLE
            .iter()
            .find(|info| info.key == normalized)
            .map(|info| info.policy)
            .ok_or_else(|| {
                format!(
                    "unknown scheduling policy '{}' (expected one of: fcfs, sjf, priority, round_robin, multilevel_queue)",
                    s
                )
            })
    }
}

/// Snapshot of the engine's configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub active_policy: SchedulingPolicy,
    pub time_quantum_ms: u64,
    pub engine_start: Instant,
}

/// Applies the active policy to published batches.
///
/// Policy and quantum are atomics, so switching takes effect on the next
/// `order` call from any thread without locking.
#[derive(Debug)]
pub struct SchedulingEngine {
    policy: AtomicU8,
    time_quantum_ms: AtomicU64,
    started: Instant,
}

impl SchedulingEngine {
    pub fn new(policy: SchedulingPolicy, time_quantum_ms: u64, started: Instant) -> Self {
        Self {
            policy: AtomicU8::new(policy.index()),
            time_quantum_ms: AtomicU64::new(time_quantum_ms),
            started,
        }
    }

    pub fn policy(&self) -> SchedulingPolicy {
        SchedulingPolicy::from_index(self.policy.load(AtomicOrdering::Relaxed))
    }

    pub fn set_policy(&self, policy: SchedulingPolicy) {
        self.policy.store(policy.index(), AtomicOrdering::Relaxed);
    }

    pub fn time_quantum_ms(&self) -> u64 {
        self.time_quantum_ms.load(AtomicOrdering::Relaxed)
    }

    pub fn set_time_quantum_ms(&self, quantum_ms: u64) {
        self.time_quantum_ms.store(quantum_ms, AtomicOrdering::Relaxed);
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn config(&self) -> SchedulerConfig {
        SchedulerConfig {
            active_policy: self.policy(),
            time_quantum_ms: self.time_quantum_ms(),
            engine_start: self.started,
        }
    }

    /// Orders `batch` under the active policy at the current instant.
    pub fn order(&self, batch: &[TrackedProcess]) -> Vec<TrackedProcess> {
        self.order_at(batch, Instant::now())
    }

    /// Like [`order`](Self::order) with an explicit clock reading.
    pub fn order_at(&self, batch: &[TrackedProcess], now: Instant) -> Vec<TrackedProcess> {
        order_processes(
            batch,
            self.policy(),
            self.time_quantum_ms(),
            now.saturating_duration_since(self.started),
        )
    }
}

fn by_cpu_desc(a: &TrackedProcess, b: &TrackedProcess) -> Ordering {
    b.cpu_percent().total_cmp(&a.cpu_percent())
}

/// Round-robin rotation offset for a batch of `len` processes.
///
/// A zero quantum disables rotation.
pub fn rotation_offset(len: usize, quantum_ms: u64, elapsed: Duration) -> usize {
    if len == 0 || quantum_ms == 0 {
        return 0;
    }
    let slices = elapsed.as_millis() / quantum_ms as u128;
    (slices % len as u128) as usize
}

/// Orders a batch under `policy`. The result is a permutation of `batch`.
pub fn order_processes(
    batch: &[TrackedProcess],
    policy: SchedulingPolicy,
    quantum_ms: u64,
    elapsed: Duration,
) -> Vec<TrackedProcess> {
    let mut out = batch.to_vec();
    match policy {
        SchedulingPolicy::Fcfs => {
            out.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        }
        SchedulingPolicy::Sjf => {
            out.sort_by(|a, b| a.cpu_percent().total_cmp(&b.cpu_percent()));
        }
        SchedulingPolicy::Priority => {
            out.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        SchedulingPolicy::RoundRobin => {
            let offset = rotation_offset(out.len(), quantum_ms, elapsed);
            out.rotate_left(offset);
            out.sort_by(by_cpu_desc);
        }
        SchedulingPolicy::MultilevelQueue => {
            let (mut system, mut user): (Vec<_>, Vec<_>) = out
                .into_iter()
                .partition(|p| p.cpu_percent() > SYSTEM_QUEUE_CPU_THRESHOLD);
            system.sort_by(by_cpu_desc);
            user.sort_by(by_cpu_desc);
            system.append(&mut user);
            out = system;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProcessSnapshot;

    fn tracked(pid: u32, cpu: f64, arrival: f64, priority: u8) -> TrackedProcess {
        TrackedProcess {
            snapshot: ProcessSnapshot {
                cpu_percent: cpu,
                ..ProcessSnapshot::basic(pid, format!("p{}", pid))
            },
            arrival_time: arrival,
            priority,
            sequence_number: pid as u64,
        }
    }

    fn pids(batch: &[TrackedProcess]) -> Vec<u32> {
        batch.iter().map(|p| p.pid()).collect()
    }

    // -------------------------------------------------------------------------
    // Policy table
    // -------------------------------------------------------------------------

    #[test]
    fn test_policy_names_and_descriptions() {
        assert_eq!(SchedulingPolicy::Fcfs.name(), "First Come First Served");
        assert_eq!(
            SchedulingPolicy::MultilevelQueue.description(),
            "System and user processes in separate queues"
        );
        for policy in SchedulingPolicy::ALL {
            assert_eq!(policy.key().parse::<SchedulingPolicy>(), Ok(policy));
            assert_eq!(SchedulingPolicy::from_index(policy.index()), policy);
        }
    }

    #[test]
    fn test_policy_from_str_aliases() {
        assert_eq!("rr".parse(), Ok(SchedulingPolicy::RoundRobin));
        assert_eq!("MLQ".parse(), Ok(SchedulingPolicy::MultilevelQueue));
        assert_eq!("round-robin".parse(), Ok(SchedulingPolicy::RoundRobin));
        assert!("lottery".parse::<SchedulingPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&SchedulingPolicy::MultilevelQueue).expect("serialize");
        assert_eq!(json, "\"multilevel_queue\"");
        let parsed: SchedulingPolicy = serde_json::from_str("\"rr\"").expect("deserialize");
        assert_eq!(parsed, SchedulingPolicy::RoundRobin);
    }

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------

    #[test]
    fn test_sjf_scenario() {
        let batch = vec![
            tracked(1, 2.0, 0.0, 50),
            tracked(2, 40.0, 0.0, 50),
            tracked(3, 5.0, 0.0, 50),
        ];
        let out = order_processes(&batch, SchedulingPolicy::Sjf, 10, Duration::ZERO);
        assert_eq!(pids(&out), vec![1, 3, 2]);
    }

    #[test]
    fn test_fcfs_is_stable_on_ties() {
        let batch = vec![
            tracked(1, 0.0, 2.0, 50),
            tracked(2, 0.0, 1.0, 50),
            tracked(3, 0.0, 1.0, 50),
        ];
        let out = order_processes(&batch, SchedulingPolicy::Fcfs, 10, Duration::ZERO);
        assert_eq!(pids(&out), vec![2, 3, 1]);
    }

    #[test]
    fn test_priority_descending() {
        let batch = vec![
            tracked(1, 0.0, 0.0, 10),
            tracked(2, 0.0, 0.0, 90),
            tracked(3, 0.0, 0.0, 50),
        ];
        let out = order_processes(&batch, SchedulingPolicy::Priority, 10, Duration::ZERO);
        assert_eq!(pids(&out), vec![2, 3, 1]);
    }

    #[test]
    fn test_multilevel_queue_partitions() {
        let batch = vec![
            tracked(1, 1.0, 0.0, 50),
            tracked(2, 6.0, 0.0, 50),
            tracked(3, 5.0, 0.0, 50),
            tracked(4, 30.0, 0.0, 50),
        ];
        let out = order_processes(&batch, SchedulingPolicy::MultilevelQueue, 10, Duration::ZERO);
        assert_eq!(pids(&out), vec![4, 2, 3, 1]);
    }

    #[test]
    fn test_round_robin_rotation_breaks_ties() {
        let batch = vec![
            tracked(1, 0.0, 0.0, 50),
            tracked(2, 0.0, 0.0, 50),
            tracked(3, 0.0, 0.0, 50),
        ];
        // 25ms / 10ms quantum = 2 slices -> rotate by 2
        let out = order_processes(
            &batch,
            SchedulingPolicy::RoundRobin,
            10,
            Duration::from_millis(25),
        );
        assert_eq!(pids(&out), vec![3, 1, 2]);

        // cpu still dominates
        let batch = vec![tracked(1, 1.0, 0.0, 50), tracked(2, 9.0, 0.0, 50)];
        let out = order_processes(
            &batch,
            SchedulingPolicy::RoundRobin,
            10,
            Duration::from_millis(10),
        );
        assert_eq!(pids(&out), vec![2, 1]);
    }

    #[test]
    fn test_rotation_offset_zero_quantum() {
        assert_eq!(rotation_offset(5, 0, Duration::from_secs(100)), 0);
        assert_eq!(rotation_offset(0, 10, Duration::from_secs(100)), 0);
        assert_eq!(rotation_offset(4, 10, Duration::from_millis(130)), 1);
    }

    #[test]
    fn test_empty_batch_for_every_policy() {
        for policy in SchedulingPolicy::ALL {
            assert!(order_processes(&[], policy, 10, Duration::from_secs(3)).is_empty());
        }
    }

    // -------------------------------------------------------------------------
    // Engine
    // -------------------------------------------------------------------------

    #[test]
    fn test_engine_switches_policy() {
        let start = Instant::now();
        let engine = SchedulingEngine::new(SchedulingPolicy::Sjf, 10, start);
        let batch = vec![tracked(1, 9.0, 1.0, 50), tracked(2, 1.0, 0.0, 50)];

        assert_eq!(pids(&engine.order_at(&batch, start)), vec![2, 1]);
        engine.set_policy(SchedulingPolicy::Fcfs);
        assert_eq!(engine.policy(), SchedulingPolicy::Fcfs);
        assert_eq!(pids(&engine.order_at(&batch, start)), vec![2, 1]);
        engine.set_policy(SchedulingPolicy::Priority);
        engine.set_time_quantum_ms(40);

        let cfg = engine.config();
        assert_eq!(cfg.active_policy, SchedulingPolicy::Priority);
        assert_eq!(cfg.time_quantum_ms, 40);
        assert_eq!(cfg.engine_start, start);
    }
}
