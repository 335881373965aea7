//! Configuration management for herakles-proc-scheduler.
//!
//! This module handles loading and validating configuration from files.
//! It supports YAML, JSON, and TOML formats; CLI overrides are merged by the
//! binary on top of what is loaded here.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::scheduler::SchedulingPolicy;

// Default configuration constants
pub const DEFAULT_MAX_PROCESSES: usize = 150;
pub const DEFAULT_TIME_QUANTUM_MS: u64 = 10;
pub const DEFAULT_CACHE_TTL_MS: u64 = 1000;
pub const DEFAULT_WARMUP_INTERVAL_MS: u64 = 50;
pub const DEFAULT_WARMUP_LIMIT: usize = 100;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_SUMMARY_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_POLL_SLICE_MS: u64 = 200;
pub const DEFAULT_STALE_AFTER_FAILURES: u64 = 3;
pub const DEFAULT_TERMINATION_TIMEOUT_MS: u64 = 2000;

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Effective configuration; every field is optional so files may be partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Acquisition
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,
    #[serde(alias = "apps-only")]
    pub apps_only: Option<bool>,
    #[serde(alias = "include-names")]
    pub include_names: Option<Vec<String>>,
    #[serde(alias = "exclude-names")]
    pub exclude_names: Option<Vec<String>>,
    pub parallelism: Option<usize>,
    #[serde(alias = "cache-ttl-ms")]
    pub cache_ttl_ms: Option<u64>,
    #[serde(alias = "warmup-interval-ms")]
    pub warmup_interval_ms: Option<u64>,
    #[serde(alias = "warmup-limit")]
    pub warmup_limit: Option<usize>,

    // Scheduling visualization
    pub policy: Option<SchedulingPolicy>,
    #[serde(alias = "time-quantum-ms")]
    pub time_quantum_ms: Option<u64>,

    // Sampling loop
    #[serde(alias = "refresh-interval-ms")]
    pub refresh_interval_ms: Option<u64>,
    #[serde(alias = "summary-interval-ms")]
    pub summary_interval_ms: Option<u64>,
    #[serde(alias = "poll-slice-ms")]
    pub poll_slice_ms: Option<u64>,
    #[serde(alias = "stale-after-failures")]
    pub stale_after_failures: Option<u64>,

    // Termination
    #[serde(alias = "termination-timeout-ms")]
    pub termination_timeout_ms: Option<u64>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    /// Path to JSON fixture file (uses a synthetic process table instead of /proc)
    #[serde(alias = "test-data-file")]
    pub test_data_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_processes: Some(DEFAULT_MAX_PROCESSES),
            apps_only: Some(true),
            include_names: None,
            exclude_names: None,
            parallelism: None,
            cache_ttl_ms: Some(DEFAULT_CACHE_TTL_MS),
            warmup_interval_ms: Some(DEFAULT_WARMUP_INTERVAL_MS),
            warmup_limit: Some(DEFAULT_WARMUP_LIMIT),
            policy: Some(SchedulingPolicy::RoundRobin),
            time_quantum_ms: Some(DEFAULT_TIME_QUANTUM_MS),
            refresh_interval_ms: Some(DEFAULT_REFRESH_INTERVAL_MS),
            summary_interval_ms: Some(DEFAULT_SUMMARY_INTERVAL_MS),
            poll_slice_ms: Some(DEFAULT_POLL_SLICE_MS),
            stale_after_failures: Some(DEFAULT_STALE_AFTER_FAILURES),
            termination_timeout_ms: Some(DEFAULT_TERMINATION_TIMEOUT_MS),
            log_level: Some("info".into()),
            test_data_file: None,
        }
    }
}

impl Config {
    pub fn max_processes(&self) -> usize {
        self.max_processes.unwrap_or(DEFAULT_MAX_PROCESSES)
    }

    pub fn apps_only(&self) -> bool {
        self.apps_only.unwrap_or(true)
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy.unwrap_or(SchedulingPolicy::RoundRobin)
    }

    pub fn time_quantum_ms(&self) -> u64 {
        self.time_quantum_ms.unwrap_or(DEFAULT_TIME_QUANTUM_MS)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms.unwrap_or(DEFAULT_CACHE_TTL_MS))
    }

    pub fn warmup_interval(&self) -> Duration {
        Duration::from_millis(self.warmup_interval_ms.unwrap_or(DEFAULT_WARMUP_INTERVAL_MS))
    }

    pub fn warmup_limit(&self) -> usize {
        self.warmup_limit.unwrap_or(DEFAULT_WARMUP_LIMIT)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.unwrap_or(DEFAULT_REFRESH_INTERVAL_MS))
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms.unwrap_or(DEFAULT_SUMMARY_INTERVAL_MS))
    }

    pub fn poll_slice(&self) -> Duration {
        Duration::from_millis(self.poll_slice_ms.unwrap_or(DEFAULT_POLL_SLICE_MS))
    }

    pub fn stale_after_failures(&self) -> u64 {
        self.stale_after_failures
            .unwrap_or(DEFAULT_STALE_AFTER_FAILURES)
    }

    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(
            self.termination_timeout_ms
                .unwrap_or(DEFAULT_TERMINATION_TIMEOUT_MS),
        )
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.max_processes == Some(0) {
        return Err("max_processes must be greater than 0".into());
    }

    if cfg.time_quantum_ms == Some(0) {
        return Err("time_quantum_ms must be greater than 0".into());
    }

    for (name, value) in [
        ("refresh_interval_ms", cfg.refresh_interval_ms),
        ("summary_interval_ms", cfg.summary_interval_ms),
        ("poll_slice_ms", cfg.poll_slice_ms),
    ] {
        if value == Some(0) {
            return Err(format!("{} must be greater than 0", name).into());
        }
    }

    if cfg.poll_slice() > cfg.refresh_interval() {
        return Err(format!(
            "poll_slice_ms ({}) must not exceed refresh_interval_ms ({})",
            cfg.poll_slice().as_millis(),
            cfg.refresh_interval().as_millis()
        )
        .into());
    }

    if cfg.stale_after_failures == Some(0) {
        return Err("stale_after_failures must be greater than 0".into());
    }

    if let Some(path) = &cfg.test_data_file {
        if !path.exists() {
            return Err(format!("test_data_file not found: {}", path.display()).into());
        }
    }

    Ok(())
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/herakles/proc-scheduler.yaml",
            "/etc/herakles/proc-scheduler.yml",
            "/etc/herakles/proc-scheduler.json",
            "./herakles-proc-scheduler.yaml",
            "./herakles-proc-scheduler.yml",
            "./herakles-proc-scheduler.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if path.to_string_lossy().is_empty() || !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;
    let loaded = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(merge_with_defaults(loaded))
}

/// Parses config text; the extension picks the format, YAML otherwise.
pub fn parse_config(content: &str, extension: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Fills every field a file left out with its default.
pub fn merge_with_defaults(file: Config) -> Config {
    let d = Config::default();
    Config {
        max_processes: file.max_processes.or(d.max_processes),
        apps_only: file.apps_only.or(d.apps_only),
        include_names: file.include_names.or(d.include_names),
        exclude_names: file.exclude_names.or(d.exclude_names),
        parallelism: file.parallelism.or(d.parallelism),
        cache_ttl_ms: file.cache_ttl_ms.or(d.cache_ttl_ms),
        warmup_interval_ms: file.warmup_interval_ms.or(d.warmup_interval_ms),
        warmup_limit: file.warmup_limit.or(d.warmup_limit),
        policy: file.policy.or(d.policy),
        time_quantum_ms: file.time_quantum_ms.or(d.time_quantum_ms),
        refresh_interval_ms: file.refresh_interval_ms.or(d.refresh_interval_ms),
        summary_interval_ms: file.summary_interval_ms.or(d.summary_interval_ms),
        poll_slice_ms: file.poll_slice_ms.or(d.poll_slice_ms),
        stale_after_failures: file.stale_after_failures.or(d.stale_after_failures),
        termination_timeout_ms: file.termination_timeout_ms.or(d.termination_timeout_ms),
        log_level: file.log_level.or(d.log_level),
        test_data_file: file.test_data_file.or(d.test_data_file),
    }
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
