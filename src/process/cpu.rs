//! CPU statistics parsing for process sampling.
//!
//! This module provides functions to parse CPU time and start time from
//! `/proc/<pid>/stat` and a small per-pid cache for delta-based CPU percent
//! between acquisitions.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::error::HostError;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

// Offsets into the fields that follow "(comm)"; field 3 (state) is index 0.
const UTIME_IDX: usize = 11;
const STIME_IDX: usize = 12;
const STARTTIME_IDX: usize = 19;

/// Splits a stat line into the fields after the command name.
///
/// The command name may itself contain spaces and parentheses, so the split
/// happens after the last `)`.
fn stat_fields(content: &str) -> Option<Vec<&str>> {
    let close = content.rfind(')')?;
    Some(content[close + 1..].split_whitespace().collect())
}

/// Parses total CPU time (user+system) in seconds from stat contents.
pub fn parse_cpu_time_from_stat(pid: u32, content: &str) -> Result<f64, HostError> {
    let fields = stat_fields(content).ok_or(HostError::Malformed { pid, what: "stat" })?;
    if fields.len() <= STIME_IDX {
        return Err(HostError::Malformed { pid, what: "stat" });
    }
    let utime: f64 = fields[UTIME_IDX].parse().unwrap_or(0.0);
    let stime: f64 = fields[STIME_IDX].parse().unwrap_or(0.0);
    Ok((utime + stime) / *CLK_TCK)
}

/// Parses process start time (seconds since boot) from stat contents.
pub fn parse_start_time_from_stat(pid: u32, content: &str) -> Result<f64, HostError> {
    let fields = stat_fields(content).ok_or(HostError::Malformed { pid, what: "stat" })?;
    let jiffies: u64 = fields
        .get(STARTTIME_IDX)
        .and_then(|v| v.parse().ok())
        .ok_or(HostError::Malformed {
            pid,
            what: "starttime",
        })?;
    Ok(jiffies as f64 / *CLK_TCK)
}

fn read_stat(pid: u32, proc_path: &Path) -> Result<String, HostError> {
    let stat_path = proc_path.join("stat");
    fs::read_to_string(&stat_path)
        .map_err(|e| HostError::from_io(pid, stat_path.display().to_string(), e))
}

/// Parse total CPU time (user+system) in seconds from /proc/<pid>/stat.
pub fn parse_cpu_time_seconds(pid: u32, proc_path: &Path) -> Result<f64, HostError> {
    parse_cpu_time_from_stat(pid, &read_stat(pid, proc_path)?)
}

/// Parse process start time from /proc/<pid>/stat (field 22).
pub fn parse_start_time_seconds(pid: u32, proc_path: &Path) -> Result<f64, HostError> {
    parse_start_time_from_stat(pid, &read_stat(pid, proc_path)?)
}

/// CPU percent for `delta_cpu_seconds` of CPU time consumed over `wall_seconds`.
///
/// Non-positive deltas (counter reset, pid reuse, clock skew) yield 0.
pub fn cpu_percent_between(delta_cpu_seconds: f64, wall_seconds: f64) -> f64 {
    if wall_seconds <= 0.0 || delta_cpu_seconds <= 0.0 {
        return 0.0;
    }
    (delta_cpu_seconds / wall_seconds) * 100.0
}

/// Cumulative CPU time observed for one pid at one instant.
#[derive(Debug, Clone, Copy)]
pub struct CpuEntry {
    pub cpu_time_seconds: f64,
    pub observed_at: Instant,
}

/// Per-pid CPU time memory used to compute usage across calls.
///
/// Owned by the acquiring thread; entries for pids missing from the latest
/// pass are dropped by `retain_pids`.
#[derive(Debug, Default)]
pub struct CpuCache {
    entries: HashMap<u32, CpuEntry>,
}

impl CpuCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new reading and returns the percent since the previous one,
    /// or 0 when this is the first reading for `pid`.
    pub fn observe(&mut self, pid: u32, cpu_time_seconds: f64, now: Instant) -> f64 {
        let percent = match self.entries.get(&pid) {
            Some(prev) => cpu_percent_between(
                cpu_time_seconds - prev.cpu_time_seconds,
                now.saturating_duration_since(prev.observed_at).as_secs_f64(),
            ),
            None => 0.0,
        };
        self.entries.insert(
            pid,
            CpuEntry {
                cpu_time_seconds,
                observed_at: now,
            },
        );
        percent
    }

    pub fn get(&self, pid: u32) -> Option<CpuEntry> {
        self.entries.get(&pid).copied()
    }

    pub fn retain_pids(&mut self, keep: impl Fn(u32) -> bool) {
        self.entries.retain(|pid, _| keep(*pid));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
