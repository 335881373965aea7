//! System-wide resource readings from the /proc filesystem.
//!
//! This module provides the aggregate CPU percent (from `/proc/stat` deltas)
//! and memory totals (from `/proc/meminfo`) that make up the resource summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Memory totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }

    pub fn used_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes() as f64 / self.total_bytes as f64 * 100.0
    }
}

/// CPU statistics for calculating usage ratios.
#[derive(Debug, Clone, Copy)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Aggregate host load published on its own cadence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSummary {
    pub generated_at: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub memory_percent: f64,
}

/// Parses MemTotal and MemAvailable (kB) from /proc/meminfo contents.
pub fn parse_meminfo(content: &str) -> Result<MemoryInfo, String> {
    let mut total_bytes: Option<u64> = None;
    let mut available_bytes: Option<u64> = None;

    for line in content.lines() {
        let field = if line.starts_with("MemTotal:") {
            &mut total_bytes
        } else if line.starts_with("MemAvailable:") {
            &mut available_bytes
        } else {
            continue;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            if let Ok(kb) = parts[1].parse::<u64>() {
                *field = Some(kb * 1024);
            }
        }
        if total_bytes.is_some() && available_bytes.is_some() {
            break;
        }
    }

    match (total_bytes, available_bytes) {
        (Some(total), Some(available)) => Ok(MemoryInfo {
            total_bytes: total,
            available_bytes: available,
        }),
        _ => Err("Failed to parse required fields from /proc/meminfo".to_string()),
    }
}

/// Parses cpu lines of /proc/stat.
///
/// "cpu" represents total across all cores, "cpu0", "cpu1", etc. are individual cores.
pub fn parse_cpu_stats(content: &str) -> Result<HashMap<String, CpuStat>, String> {
    let mut stats = HashMap::new();

    for line in content.lines() {
        if line.starts_with("cpu") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                continue;
            }

            let cpu_name = parts[0].to_string();

            let user = parts[1].parse::<u64>().unwrap_or(0);
            let nice = parts[2].parse::<u64>().unwrap_or(0);
            let system = parts[3].parse::<u64>().unwrap_or(0);
            let idle = parts[4].parse::<u64>().unwrap_or(0);
            let iowait = parts[5].parse::<u64>().unwrap_or(0);
            let irq = parts[6].parse::<u64>().unwrap_or(0);
            let softirq = parts[7].parse::<u64>().unwrap_or(0);
            let steal = if parts.len() > 8 {
                parts[8].parse::<u64>().unwrap_or(0)
            } else {
                0
            };

            stats.insert(
                cpu_name,
                CpuStat {
                    user,
                    nice,
                    system,
                    idle,
                    iowait,
                    irq,
                    softirq,
                    steal,
                },
            );
        }
    }

    if stats.is_empty() {
        return Err("No CPU statistics found in /proc/stat".to_string());
    }

    Ok(stats)
}

/// Busy percent between two aggregate readings; 0 when no time elapsed.
pub fn cpu_usage_percent(previous: &CpuStat, current: &CpuStat) -> f64 {
    let delta_total = current.total().saturating_sub(previous.total());
    let delta_idle = current.idle_total().saturating_sub(previous.idle_total());
    if delta_total == 0 {
        return 0.0;
    }
    delta_total.saturating_sub(delta_idle) as f64 / delta_total as f64 * 100.0
}

/// Stateful reader producing resource summaries from consecutive /proc samples.
///
/// The first summary reports 0% CPU because there is no previous reading yet.
pub struct ResourceProbe {
    root: PathBuf,
    previous: Option<CpuStat>,
}

impl Default for ResourceProbe {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ResourceProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            previous: None,
        }
    }

    pub fn sample(&mut self) -> Result<ResourceSummary, String> {
        let stat_path = self.root.join("stat");
        let stat = fs::read_to_string(&stat_path)
            .map_err(|e| format!("Failed to read {}: {}", stat_path.display(), e))?;
        let meminfo_path = self.root.join("meminfo");
        let meminfo = fs::read_to_string(&meminfo_path)
            .map_err(|e| format!("Failed to read {}: {}", meminfo_path.display(), e))?;

        let current = *parse_cpu_stats(&stat)?
            .get("cpu")
            .ok_or_else(|| "No aggregate cpu line in /proc/stat".to_string())?;
        let memory = parse_meminfo(&meminfo)?;

        let cpu_percent = self
            .previous
            .map(|prev| cpu_usage_percent(&prev, &current))
            .unwrap_or(0.0);
        self.previous = Some(current);

        Ok(ResourceSummary {
            generated_at: Utc::now(),
            cpu_percent,
            memory_total_bytes: memory.total_bytes,
            memory_used_bytes: memory.used_bytes(),
            memory_percent: memory.used_percent(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MEMINFO: &str = "MemTotal:       16000000 kB\nMemFree:         1000000 kB\nMemAvailable:    4000000 kB\nBuffers:          100000 kB\n";

    #[test]
    fn test_parse_meminfo() {
        let mem = parse_meminfo(MEMINFO).expect("parse");
        assert_eq!(mem.total_bytes, 16_000_000 * 1024);
        assert_eq!(mem.used_bytes(), 12_000_000 * 1024);
        assert!((mem.used_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_fields() {
        assert!(parse_meminfo("MemTotal: 10 kB\n").is_err());
    }

    #[test]
    fn test_parse_cpu_stats() {
        let stats = parse_cpu_stats(
            "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0\nintr 1 2 3\n",
        )
        .expect("parse");
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["cpu"].total(), 1000);
        assert_eq!(stats["cpu"].idle_total(), 800);
    }

    #[test]
    fn test_cpu_usage_percent() {
        let a = CpuStat {
            user: 100,
            nice: 0,
            system: 100,
            idle: 700,
            iowait: 100,
            irq: 0,
            softirq: 0,
            steal: 0,
        };
        let b = CpuStat {
            user: 150,
            system: 150,
            idle: 800,
            ..a
        };
        // 200 ticks elapsed, 100 idle
        assert!((cpu_usage_percent(&a, &b) - 50.0).abs() < 1e-9);
        assert_eq!(cpu_usage_percent(&a, &a), 0.0);
    }

    #[test]
    fn test_resource_probe_first_sample_zero_cpu() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("meminfo"), MEMINFO).expect("write meminfo");
        std::fs::write(dir.path().join("stat"), "cpu  100 0 100 700 100 0 0 0\n")
            .expect("write stat");

        let mut probe = ResourceProbe::new(dir.path());
        let first = probe.sample().expect("sample");
        assert_eq!(first.cpu_percent, 0.0);
        assert!((first.memory_percent - 75.0).abs() < 1e-9);

        std::fs::write(dir.path().join("stat"), "cpu  200 0 200 750 150 0 0 0\n")
            .expect("write stat");
        let second = probe.sample().expect("sample");
        // 300 ticks elapsed, 100 idle+iowait
        assert!((second.cpu_percent - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_resource_probe_missing_files() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut probe = ResourceProbe::new(dir.path());
        assert!(probe.sample().is_err());
    }
}
