//! Integration tests for the process state tracker.
//!
//! These tests drive the tracker through several sampling cycles and verify
//! arrival time, sequence numbering, smoothing and eviction.

use herakles_proc_scheduler::{ProcessSnapshot, ProcessStateTracker};
use std::time::{Duration, Instant};

fn snap(pid: u32, cpu: f64) -> ProcessSnapshot {
    ProcessSnapshot {
        cpu_percent: cpu,
        ..ProcessSnapshot::basic(pid, format!("p{}", pid))
    }
}

#[test]
fn test_reappearing_pid_is_a_new_process() {
    let start = Instant::now();
    let mut tracker = ProcessStateTracker::new(start);

    let first = tracker.update(&[snap(100, 1.0)], start + Duration::from_secs(1));
    assert_eq!(first[0].sequence_number, 1);

    // absent for one cycle
    tracker.update(&[snap(200, 1.0)], start + Duration::from_secs(2));

    let again = tracker.update(&[snap(100, 1.0)], start + Duration::from_secs(4));
    assert_eq!(again[0].sequence_number, 3);
    assert!((again[0].arrival_time - 4.0).abs() < 1e-9);
}

#[test]
fn test_priority_smoothing_scenario() {
    let start = Instant::now();
    let mut tracker = ProcessStateTracker::new(start);
    let seeded = tracker.update(&[snap(5, 0.0)], start);
    assert_eq!(seeded[0].priority, 50);

    let smoothed = tracker.update(&[snap(5, 50.0)], start);
    assert_eq!(smoothed[0].priority, 65);
}

#[test]
fn test_sequence_numbers_strictly_increase() {
    let start = Instant::now();
    let mut tracker = ProcessStateTracker::new(start);
    let mut last = 0;

    for round in 0..5u32 {
        let batch: Vec<ProcessSnapshot> = (0..4).map(|i| snap(round * 10 + i, 0.0)).collect();
        for p in tracker.update(&batch, start) {
            assert!(p.sequence_number > last);
            last = p.sequence_number;
        }
    }
    assert_eq!(last, 20);
}

#[test]
fn test_priority_stays_in_range() {
    let start = Instant::now();
    let mut tracker = ProcessStateTracker::new(start);
    for cpu in [0.0, 500.0, -3.0, f64::INFINITY, 12.0, 0.0] {
        let out = tracker.update(&[snap(1, cpu)], start);
        assert!((1..=100).contains(&out[0].priority));
    }
}
