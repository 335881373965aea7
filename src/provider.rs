//! Snapshot provider: throttled, cached sampling of the host process table.
//!
//! One `acquire` call enumerates pids, optionally narrows them to processes
//! owning a visible window, warms up CPU readings for a bounded subset,
//! sleeps once, then reads details for every pid in parallel. Failures
//! degrade the result instead of surfacing to the caller.

use ahash::AHashMap as HashMap;
use ahash::AHashSet as HashSet;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cache::{AcquisitionCache, AcquisitionKey, ProcessSnapshot};
use crate::config::Config;
use crate::error::HostError;
use crate::health_stats::SamplerStats;
use crate::process::cpu::{cpu_percent_between, CpuCache};
use crate::process::host::{ProcessDetails, ProcessHost};
use crate::process::memory::{bytes_to_mb, round1};
use crate::process::scanner::should_include_process;
use crate::process::window::WindowOwnership;

/// Result of one `acquire` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    /// Sorted descending by (cpu, memory), at most `max_count` long.
    pub processes: Vec<ProcessSnapshot>,
    /// True when full enumeration failed and the pid+name fallback was used.
    pub degraded: bool,
    pub from_cache: bool,
}

/// Timing knobs of the provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub cache_ttl: Duration,
    pub warmup_interval: Duration,
    pub warmup_limit: usize,
    pub include_names: Option<Vec<String>>,
    pub exclude_names: Option<Vec<String>>,
}

impl ProviderSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            cache_ttl: cfg.cache_ttl(),
            warmup_interval: cfg.warmup_interval(),
            warmup_limit: cfg.warmup_limit(),
            include_names: cfg.include_names.clone(),
            exclude_names: cfg.exclude_names.clone(),
        }
    }

    fn name_filter(&self) -> Config {
        Config {
            include_names: self.include_names.clone(),
            exclude_names: self.exclude_names.clone(),
            ..Config::default()
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct ProcessRead {
    pid: u32,
    details: ProcessDetails,
    cpu_time: Option<f64>,
    read_at: Instant,
}

pub struct SnapshotProvider {
    host: Arc<dyn ProcessHost>,
    windows: Arc<dyn WindowOwnership>,
    settings: ProviderSettings,
    name_filter: Config,
    cache: AcquisitionCache,
    cpu: CpuCache,
    stats: Arc<SamplerStats>,
}

impl SnapshotProvider {
    pub fn new(
        host: Arc<dyn ProcessHost>,
        windows: Arc<dyn WindowOwnership>,
        settings: ProviderSettings,
        stats: Arc<SamplerStats>,
    ) -> Self {
        let name_filter = settings.name_filter();
        Self {
            host,
            windows,
            settings,
            name_filter,
            cache: AcquisitionCache::new(),
            cpu: CpuCache::new(),
            stats,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Drops the cached result so the next call samples the host.
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// Returns up to `max_count` processes (0 means unlimited).
    pub fn acquire(&mut self, max_count: usize, apps_only: bool) -> Acquisition {
        self.acquire_at(max_count, apps_only, Instant::now())
    }

    /// Like [`acquire`](Self::acquire) with an explicit clock reading for the
    /// cache window.
    pub fn acquire_at(&mut self, max_count: usize, apps_only: bool, now: Instant) -> Acquisition {
        let key = AcquisitionKey {
            max_count,
            apps_only,
        };
        if let Some((processes, degraded)) = self.cache.lookup(key, now, self.settings.cache_ttl) {
            self.stats.record_cache_hit();
            debug!("Acquisition served from cache ({} processes)", processes.len());
            return Acquisition {
                processes: processes.to_vec(),
                degraded,
                from_cache: true,
            };
        }
        self.stats.record_cache_miss();

        let started = Instant::now();

        // Window owners are read after enumeration so both views describe the
        // same host state.
        let (mut processes, degraded, scanned) = match self.host.enumerate() {
            Ok(pids) => {
                self.stats.record_enumeration_success();
                let scanned = pids.len();
                let visible = if apps_only { self.visible_pids() } else { None };
                (self.sample(pids, visible.as_ref()), false, scanned)
            }
            Err(e) => {
                let consecutive = self.stats.record_enumeration_failure();
                warn!(
                    "Process enumeration failed ({}), using reduced listing (consecutive failures: {})",
                    e, consecutive
                );
                let visible = if apps_only { self.visible_pids() } else { None };
                let basic = self.fallback(visible.as_ref());
                let scanned = basic.len();
                (basic, true, scanned)
            }
        };

        processes.sort_by(|a, b| {
            b.cpu_percent
                .total_cmp(&a.cpu_percent)
                .then(b.memory_mb.total_cmp(&a.memory_mb))
        });
        if max_count > 0 {
            processes.truncate(max_count);
        }

        self.stats
            .record_acquisition(scanned as u64, started.elapsed().as_secs_f64());
        debug!(
            "Acquired {} of {} processes in {:.3}s (degraded: {})",
            processes.len(),
            scanned,
            started.elapsed().as_secs_f64(),
            degraded
        );

        self.cache.store(key, now, processes.clone(), degraded);
        Acquisition {
            processes,
            degraded,
            from_cache: false,
        }
    }

    /// Visible-window owners, or `None` when the filter must be a no-op.
    fn visible_pids(&self) -> Option<HashSet<u32>> {
        match self.windows.visible_window_pids() {
            Some(set) if !set.is_empty() => Some(set),
            _ => {
                self.stats.record_filter_unsupported();
                debug!("Window ownership unavailable, visible-app filter disabled");
                None
            }
        }
    }

    fn sample(&mut self, mut pids: Vec<u32>, visible: Option<&HashSet<u32>>) -> Vec<ProcessSnapshot> {
        if let Some(visible) = visible {
            pids.retain(|pid| visible.contains(pid));
        }

        let warmup = self.warm_up(&pids);

        let host = &self.host;
        let reads: Vec<(u32, Result<ProcessRead, HostError>)> = pids
            .par_iter()
            .map(|&pid| (pid, read_process(host.as_ref(), pid)))
            .collect();

        let mut out = Vec::with_capacity(reads.len());
        for (pid, read) in reads {
            let read = match read {
                Ok(r) => r,
                Err(e) => {
                    if e.is_permission_denied() {
                        self.stats.record_permission_denied();
                    } else {
                        self.stats.record_proc_read_error();
                    }
                    debug!("Skipping pid {}: {}", pid, e);
                    continue;
                }
            };

            if !should_include_process(&read.details.name, &self.name_filter) {
                continue;
            }

            let cpu_percent = self.cpu_percent_for(&read, warmup.get(&read.pid));
            out.push(ProcessSnapshot {
                pid: read.pid,
                name: read.details.name,
                exe: read.details.exe,
                memory_mb: round1(bytes_to_mb(read.details.rss_bytes)),
                cpu_percent: round1(cpu_percent),
                start_time_seconds: read.details.start_time_seconds,
            });
        }

        let present: HashSet<u32> = pids.iter().copied().collect();
        self.cpu.retain_pids(|pid| present.contains(&pid));
        out
    }

    /// Zero-duration probe over a bounded subset, followed by one fixed sleep.
    fn warm_up(&self, pids: &[u32]) -> HashMap<u32, (f64, Instant)> {
        let limit = self.settings.warmup_limit.min(pids.len());
        if limit == 0 {
            return HashMap::new();
        }

        let host = &self.host;
        let probes: Vec<(u32, (f64, Instant))> = pids[..limit]
            .par_iter()
            .filter_map(|&pid| {
                host.cpu_time_seconds(pid)
                    .ok()
                    .map(|t| (pid, (t, Instant::now())))
            })
            .collect();

        if !self.settings.warmup_interval.is_zero() {
            std::thread::sleep(self.settings.warmup_interval);
        }
        probes.into_iter().collect()
    }

    fn cpu_percent_for(&mut self, read: &ProcessRead, warm: Option<&(f64, Instant)>) -> f64 {
        if let Some(percent) = read.details.cpu_percent {
            return percent;
        }
        let Some(cpu_time) = read.cpu_time else {
            return 0.0;
        };
        let since_last = self.cpu.observe(read.pid, cpu_time, read.read_at);
        match warm {
            Some(&(warm_time, warm_at)) => cpu_percent_between(
                cpu_time - warm_time,
                read.read_at.saturating_duration_since(warm_at).as_secs_f64(),
            ),
            None => since_last,
        }
    }

    fn fallback(&self, visible: Option<&HashSet<u32>>) -> Vec<ProcessSnapshot> {
        match self.host.enumerate_basic() {
            Ok(list) => list
                .into_iter()
                .filter(|(pid, _)| visible.map_or(true, |v| v.contains(pid)))
                .filter(|(_, name)| should_include_process(name, &self.name_filter))
                .map(|(pid, name)| ProcessSnapshot::basic(pid, name))
                .collect(),
            Err(e) => {
                warn!("Reduced process listing also failed: {}", e);
                Vec::new()
            }
        }
    }
}

fn read_process(host: &dyn ProcessHost, pid: u32) -> Result<ProcessRead, HostError> {
    let details = host.details(pid)?;
    let cpu_time = if details.cpu_percent.is_some() {
        None
    } else {
        Some(host.cpu_time_seconds(pid)?)
    };
    Ok(ProcessRead {
        pid,
        details,
        cpu_time,
        read_at: Instant::now(),
    })
}
