//! Property-based tests for scheduling-policy ordering invariants.

use herakles_proc_scheduler::{order_processes, ProcessSnapshot, SchedulingPolicy, TrackedProcess};
use proptest::prelude::*;
use std::time::Duration;

fn batch_strategy() -> impl Strategy<Value = Vec<TrackedProcess>> {
    prop::collection::vec((0.0..200.0f64, 0.0..1000.0f64, 1u8..=100), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (cpu, arrival, priority))| TrackedProcess {
                snapshot: ProcessSnapshot {
                    cpu_percent: cpu,
                    ..ProcessSnapshot::basic(i as u32 + 1, format!("proc{}", i))
                },
                arrival_time: arrival,
                priority,
                sequence_number: i as u64 + 1,
            })
            .collect()
    })
}

fn policy_strategy() -> impl Strategy<Value = SchedulingPolicy> {
    prop::sample::select(SchedulingPolicy::ALL.to_vec())
}

fn sorted_pids(batch: &[TrackedProcess]) -> Vec<u32> {
    let mut pids: Vec<u32> = batch.iter().map(|p| p.pid()).collect();
    pids.sort_unstable();
    pids
}

// ============================================================================
// Permutation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every policy returns exactly the input elements.
    #[test]
    fn order_is_permutation(
        batch in batch_strategy(),
        policy in policy_strategy(),
        quantum in 0u64..100,
        elapsed_ms in 0u64..100_000,
    ) {
        let out = order_processes(&batch, policy, quantum, Duration::from_millis(elapsed_ms));
        prop_assert_eq!(out.len(), batch.len());
        prop_assert_eq!(sorted_pids(&out), sorted_pids(&batch));
    }
}

// ============================================================================
// Per-policy order
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn fcfs_ascending_arrival(batch in batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Fcfs, 10, Duration::ZERO);
        for w in out.windows(2) {
            prop_assert!(w[0].arrival_time <= w[1].arrival_time);
        }
    }

    #[test]
    fn sjf_ascending_cpu(batch in batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Sjf, 10, Duration::ZERO);
        for w in out.windows(2) {
            prop_assert!(w[0].cpu_percent() <= w[1].cpu_percent());
        }
    }

    #[test]
    fn priority_descending(batch in batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Priority, 10, Duration::ZERO);
        for w in out.windows(2) {
            prop_assert!(w[0].priority >= w[1].priority);
        }
    }

    /// System-queue processes (cpu > 5) all precede user-queue processes.
    #[test]
    fn multilevel_queue_system_first(batch in batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::MultilevelQueue, 10, Duration::ZERO);
        let first_user = out.iter().position(|p| p.cpu_percent() <= 5.0).unwrap_or(out.len());
        prop_assert!(out[first_user..].iter().all(|p| p.cpu_percent() <= 5.0));
    }

    /// Round robin is a pure function of (elapsed, quantum, batch).
    #[test]
    fn round_robin_deterministic(
        batch in batch_strategy(),
        quantum in 1u64..100,
        elapsed_ms in 0u64..100_000,
    ) {
        let elapsed = Duration::from_millis(elapsed_ms);
        let a = order_processes(&batch, SchedulingPolicy::RoundRobin, quantum, elapsed);
        let b = order_processes(&batch, SchedulingPolicy::RoundRobin, quantum, elapsed);
        prop_assert_eq!(a, b);
    }
}

// ============================================================================
// Stability on ties
// ============================================================================

/// Batches drawn from a few distinct keys so ties are common. Input index
/// is recoverable as `pid - 1`.
fn tie_batch_strategy() -> impl Strategy<Value = Vec<TrackedProcess>> {
    let cpu = prop::sample::select(vec![0.0, 1.0, 5.0, 7.5, 20.0]);
    prop::collection::vec((cpu, 1u8..=3), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (cpu, priority))| TrackedProcess {
                snapshot: ProcessSnapshot {
                    cpu_percent: cpu,
                    ..ProcessSnapshot::basic(i as u32 + 1, format!("proc{}", i))
                },
                arrival_time: 0.0,
                priority,
                sequence_number: i as u64 + 1,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn sjf_keeps_input_order_on_ties(batch in tie_batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Sjf, 10, Duration::ZERO);
        for w in out.windows(2) {
            if w[0].cpu_percent() == w[1].cpu_percent() {
                prop_assert!(w[0].pid() < w[1].pid());
            }
        }
    }

    #[test]
    fn priority_keeps_input_order_on_ties(batch in tie_batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Priority, 10, Duration::ZERO);
        for w in out.windows(2) {
            if w[0].priority == w[1].priority {
                prop_assert!(w[0].pid() < w[1].pid());
            }
        }
    }

    #[test]
    fn fcfs_keeps_input_order_on_equal_arrival(batch in tie_batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::Fcfs, 10, Duration::ZERO);
        let pids: Vec<u32> = out.iter().map(|p| p.pid()).collect();
        prop_assert_eq!(pids, sorted_pids(&batch));
    }

    /// Each queue is sorted by descending cpu, stable within equal cpu.
    #[test]
    fn multilevel_queue_sorted_and_stable_per_queue(batch in tie_batch_strategy()) {
        let out = order_processes(&batch, SchedulingPolicy::MultilevelQueue, 10, Duration::ZERO);
        let split = out.iter().position(|p| p.cpu_percent() <= 5.0).unwrap_or(out.len());
        let (system, user) = out.split_at(split);
        prop_assert!(system.iter().all(|p| p.cpu_percent() > 5.0));
        for queue in [system, user] {
            for w in queue.windows(2) {
                prop_assert!(w[0].cpu_percent() >= w[1].cpu_percent());
                if w[0].cpu_percent() == w[1].cpu_percent() {
                    prop_assert!(w[0].pid() < w[1].pid());
                }
            }
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

fn tracked(pid: u32, cpu: f64) -> TrackedProcess {
    TrackedProcess {
        snapshot: ProcessSnapshot {
            cpu_percent: cpu,
            ..ProcessSnapshot::basic(pid, format!("p{}", pid))
        },
        arrival_time: 0.0,
        priority: 50,
        sequence_number: pid as u64,
    }
}

#[test]
fn sjf_scenario() {
    let batch = vec![tracked(1, 2.0), tracked(2, 40.0), tracked(3, 5.0)];
    let out = order_processes(&batch, SchedulingPolicy::Sjf, 10, Duration::ZERO);
    let pids: Vec<u32> = out.iter().map(|p| p.pid()).collect();
    assert_eq!(pids, vec![1, 3, 2]);
}

#[test]
fn empty_batch_every_policy() {
    for policy in SchedulingPolicy::ALL {
        assert!(order_processes(&[], policy, 10, Duration::from_secs(1)).is_empty());
    }
}
