//! Snapshot command implementation.
//!
//! Runs one acquisition through the tracker and the scheduling engine and
//! prints the ordered result.

use herakles_proc_scheduler::config::Config;
use herakles_proc_scheduler::{
    ProcessStateTracker, ProviderSettings, SamplerStats, SchedulingEngine, SchedulingPolicy,
    SnapshotProvider, TrackedProcess,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use super::build_backends;

#[derive(Serialize)]
struct SnapshotOutput<'a> {
    policy: SchedulingPolicy,
    degraded: bool,
    processes: &'a [TrackedProcess],
}

/// Takes one ordered snapshot.
pub fn command_snapshot(
    json: bool,
    top: Option<usize>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let (host, windows) = build_backends(config)?;
    let mut provider = SnapshotProvider::new(
        host,
        windows,
        ProviderSettings::from_config(config),
        Arc::new(SamplerStats::new()),
    );
    let mut tracker = ProcessStateTracker::new(started);
    let engine = SchedulingEngine::new(config.policy(), config.time_quantum_ms(), started);

    let acquisition = provider.acquire(config.max_processes(), config.apps_only());
    let tracked = tracker.update(&acquisition.processes, Instant::now());
    let mut ordered = engine.order(&tracked);
    if let Some(n) = top {
        ordered.truncate(n);
    }

    if json {
        let output = SnapshotOutput {
            policy: engine.policy(),
            degraded: acquisition.degraded,
            processes: &ordered,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if acquisition.degraded {
        println!("⚠️  Full enumeration failed - showing reduced pid/name listing");
    }
    print!("{}", render_process_table(&ordered, engine.policy()));
    Ok(())
}

/// Renders an ordered batch as a fixed-width text table.
pub fn render_process_table(processes: &[TrackedProcess], policy: SchedulingPolicy) -> String {
    let mut out = String::new();
    writeln!(out, "Policy: {} - {}", policy.name(), policy.description()).ok();
    writeln!(
        out,
        "{:>4}  {:>7}  {:<24} {:>8} {:>10} {:>5} {:>9}",
        "#", "PID", "NAME", "CPU%", "MEM(MB)", "PRIO", "ARRIVAL"
    )
    .ok();

    for (i, p) in processes.iter().enumerate() {
        let name: String = p.snapshot.name.chars().take(24).collect();
        writeln!(
            out,
            "{:>4}  {:>7}  {:<24} {:>8.1} {:>10.1} {:>5} {:>8.1}s",
            i + 1,
            p.pid(),
            name,
            p.cpu_percent(),
            p.snapshot.memory_mb,
            p.priority,
            p.arrival_time
        )
        .ok();
    }

    if processes.is_empty() {
        writeln!(out, "(no processes)").ok();
    }
    out
}
