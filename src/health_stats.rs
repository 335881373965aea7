//! Health statistics for the sampling pipeline.
//!
//! This module provides types and functionality for tracking sampler health,
//! including acquisition performance, cache statistics, enumeration failures
//! and the "last sample is stale" indicator.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Instant, SystemTime};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Counters written by the sampling loop and read by anyone holding the Arc.
pub struct SamplerStats {
    // Acquisition performance
    pub scanned_processes: Stat,
    pub acquisition_duration_seconds: Stat,
    pub cycle_duration_seconds: Stat,
    pub total_cycles: AtomicU64,

    // Enumeration health
    pub enumeration_success_count: AtomicU64,
    pub enumeration_failure_count: AtomicU64,
    pub consecutive_enumeration_failures: AtomicU64,

    // Cache performance
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,

    // Error tracking
    pub proc_read_errors: AtomicU64,
    pub permission_denied_count: AtomicU64,
    pub filter_unsupported_count: AtomicU64,

    // Termination outcomes
    pub terminations_succeeded: AtomicU64,
    pub terminations_failed: AtomicU64,

    // Timing
    pub start_time: Instant,
    pub last_cycle_time: StdRwLock<Option<Instant>>,
}

impl Default for SamplerStats {
    fn default() -> Self {
        Self {
            scanned_processes: Stat::default(),
            acquisition_duration_seconds: Stat::default(),
            cycle_duration_seconds: Stat::default(),
            total_cycles: AtomicU64::new(0),
            enumeration_success_count: AtomicU64::new(0),
            enumeration_failure_count: AtomicU64::new(0),
            consecutive_enumeration_failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            proc_read_errors: AtomicU64::new(0),
            permission_denied_count: AtomicU64::new(0),
            filter_unsupported_count: AtomicU64::new(0),
            terminations_succeeded: AtomicU64::new(0),
            terminations_failed: AtomicU64::new(0),
            start_time: Instant::now(),
            last_cycle_time: StdRwLock::new(None),
        }
    }
}

impl SamplerStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_acquisition(&self, scanned: u64, duration_seconds: f64) {
        self.scanned_processes.add_sample(scanned as f64);
        self.acquisition_duration_seconds.add_sample(duration_seconds);
    }

    pub fn record_cycle(&self, duration_seconds: f64) {
        self.cycle_duration_seconds.add_sample(duration_seconds);
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_cycle_time.write() {
            *guard = Some(Instant::now());
        }
    }

    pub fn record_enumeration_success(&self) {
        self.enumeration_success_count.fetch_add(1, Ordering::Relaxed);
        self.consecutive_enumeration_failures
            .store(0, Ordering::Relaxed);
    }

    /// Returns the number of consecutive failures including this one.
    pub fn record_enumeration_failure(&self) -> u64 {
        self.enumeration_failure_count
            .fetch_add(1, Ordering::Relaxed);
        self.consecutive_enumeration_failures
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_proc_read_error(&self) {
        self.proc_read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permission_denied(&self) {
        self.permission_denied_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filter_unsupported(&self) {
        self.filter_unsupported_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_termination(&self, success: bool) {
        if success {
            self.terminations_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.terminations_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// True once `threshold` consecutive acquisitions fell back to reduced fidelity.
    pub fn is_stale(&self, threshold: u64) -> bool {
        threshold > 0 && self.consecutive_enumeration_failures.load(Ordering::Relaxed) >= threshold
    }

    pub fn get_enumeration_success_rate(&self) -> f64 {
        let success = self.enumeration_success_count.load(Ordering::Relaxed);
        let failure = self.enumeration_failure_count.load(Ordering::Relaxed);
        let total = success + failure;
        if total == 0 {
            100.0
        } else {
            (success as f64 / total as f64) * 100.0
        }
    }

    pub fn get_cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            100.0 // Default to 100% when no cache operations have occurred
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_cycle_time_str(&self) -> String {
        const SECS_PER_DAY: u64 = 86400;
        const SECS_PER_HOUR: u64 = 3600;
        const SECS_PER_MINUTE: u64 = 60;

        if let Ok(guard) = self.last_cycle_time.read() {
            if let Some(last) = *guard {
                let elapsed = last.elapsed();
                if let Ok(duration) = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
                    let secs = duration.as_secs().saturating_sub(elapsed.as_secs());
                    let hours = (secs % SECS_PER_DAY) / SECS_PER_HOUR;
                    let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
                    let seconds = secs % SECS_PER_MINUTE;
                    return format!("{:02}:{:02}:{:02}", hours, minutes, seconds);
                }
            }
        }
        "N/A".to_string()
    }

    pub fn render_table(&self) -> String {
        let (sc_cur, sc_avg, sc_max, sc_min, _) = self.scanned_processes.snapshot();
        let (ad_cur, ad_avg, ad_max, ad_min, _) = self.acquisition_duration_seconds.snapshot();
        let (cd_cur, cd_avg, cd_max, cd_min, _) = self.cycle_duration_seconds.snapshot();

        let left_col = 28usize;
        let col_w = 12usize;
        let mut out = String::new();

        writeln!(out, "SAMPLER INTERNAL STATS").ok();
        writeln!(out, "======================").ok();
        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        let mut row = |label: &str, cur: String, avg: String, max: String, min: String| {
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                cur,
                avg,
                max,
                min,
                left = left_col,
                col = col_w
            )
            .ok();
        };

        row(
            "scanned_processes",
            format!("{:.0}", sc_cur),
            format!("{:.1}", sc_avg),
            format!("{:.0}", sc_max),
            format!("{:.0}", sc_min),
        );
        row(
            "acquisition_duration (s)",
            format!("{:.3}", ad_cur),
            format!("{:.3}", ad_avg),
            format!("{:.3}", ad_max),
            format!("{:.3}", ad_min),
        );
        row(
            "cycle_duration (s)",
            format!("{:.3}", cd_cur),
            format!("{:.3}", cd_avg),
            format!("{:.3}", cd_max),
            format!("{:.3}", cd_min),
        );

        writeln!(out).ok();
        writeln!(out, "COUNTERS").ok();
        writeln!(out, "--------").ok();
        let counters: [(&str, String); 10] = [
            (
                "total_cycles",
                self.total_cycles.load(Ordering::Relaxed).to_string(),
            ),
            (
                "enumeration_success_rate (%)",
                format!("{:.1}", self.get_enumeration_success_rate()),
            ),
            (
                "consecutive_failures",
                self.consecutive_enumeration_failures
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "cache_hit_ratio (%)",
                format!("{:.1}", self.get_cache_hit_ratio()),
            ),
            (
                "proc_read_errors",
                self.proc_read_errors.load(Ordering::Relaxed).to_string(),
            ),
            (
                "permission_denied",
                self.permission_denied_count
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "window_filter_unsupported",
                self.filter_unsupported_count
                    .load(Ordering::Relaxed)
                    .to_string(),
            ),
            (
                "terminations_ok / failed",
                format!(
                    "{} / {}",
                    self.terminations_succeeded.load(Ordering::Relaxed),
                    self.terminations_failed.load(Ordering::Relaxed)
                ),
            ),
            ("uptime (s)", self.get_uptime_seconds().to_string()),
            ("last_cycle", self.get_last_cycle_time_str()),
        ];
        for (label, value) in counters {
            writeln!(out, "{:left$} | {}", label, value, left = left_col).ok();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut s = RunningStat::default();
        assert_eq!(s.avg(), 0.0);
        s.add(2.0);
        s.add(4.0);
        s.add(0.0);
        assert_eq!(s.avg(), 2.0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.last, 0.0);
    }

    #[test]
    fn test_consecutive_failures_reset_on_success() {
        let stats = SamplerStats::new();
        assert_eq!(stats.record_enumeration_failure(), 1);
        assert_eq!(stats.record_enumeration_failure(), 2);
        assert!(stats.is_stale(2));
        assert!(!stats.is_stale(3));

        stats.record_enumeration_success();
        assert!(!stats.is_stale(1));
        assert_eq!(stats.enumeration_failure_count.load(Ordering::Relaxed), 2);
        assert!((stats.get_enumeration_success_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_threshold_zero_never_stale() {
        let stats = SamplerStats::new();
        stats.record_enumeration_failure();
        assert!(!stats.is_stale(0));
    }

    #[test]
    fn test_cache_hit_ratio() {
        let stats = SamplerStats::new();
        assert_eq!(stats.get_cache_hit_ratio(), 100.0);
        stats.record_cache_hit();
        stats.record_cache_miss();
        stats.record_cache_miss();
        stats.record_cache_miss();
        assert_eq!(stats.get_cache_hit_ratio(), 25.0);
    }

    #[test]
    fn test_render_table_sections() {
        let stats = SamplerStats::new();
        stats.record_acquisition(120, 0.06);
        stats.record_cycle(0.07);
        stats.record_termination(false);

        let table = stats.render_table();
        assert!(table.contains("SAMPLER INTERNAL STATS"));
        assert!(table.contains("scanned_processes"));
        assert!(table.contains("COUNTERS"));
        assert!(table.contains("0 / 1"));
        assert!(!table.contains("N/A"));
    }
}
