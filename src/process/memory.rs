//! Resident memory parsing from `/proc/<pid>/status`.

use std::fs;
use std::path::Path;

use crate::error::HostError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Parses the leading integer of a `/proc` value such as `"   1234 kB"`.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Extracts VmRSS (in bytes) from the contents of a status file.
///
/// Kernel threads have no VmRSS line; they report 0.
pub fn parse_status_rss_bytes(content: &str) -> u64 {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(parse_kb_value)
        .map(|kb| kb * 1024)
        .unwrap_or(0)
}

/// Reads resident set size in bytes from /proc/<pid>/status.
pub fn read_rss_bytes(pid: u32, proc_path: &Path) -> Result<u64, HostError> {
    let status_path = proc_path.join("status");
    let content = fs::read_to_string(&status_path)
        .map_err(|e| HostError::from_io(pid, status_path.display().to_string(), e))?;
    Ok(parse_status_rss_bytes(&content))
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Rounds to one decimal place, matching the precision shown to operators.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
