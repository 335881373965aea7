//! Config command implementation.
//!
//! Generates configuration files in various formats.

use herakles_proc_scheduler::config::{render_config, Config, ConfigFormat};
use std::fs;
use std::path::PathBuf;

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("herakles-proc-scheduler.yaml"),
    };

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Process Scheduler Configuration
# ========================================
#
# Acquisition
# -----------
# max_processes: 150           # Processes per batch (0 = unlimited)
# apps_only: true              # Only processes owning a visible window
# include_names: null          # Include only processes matching these names
# exclude_names: null          # Exclude processes matching these names (wins over include)
# parallelism: null            # Parallel threads (null = auto)
# cache_ttl_ms: 1000           # Reuse the last acquisition for this long
# warmup_interval_ms: 50       # CPU warm-up sleep
# warmup_limit: 100            # Processes probed during warm-up
#
# Scheduling Visualization
# ------------------------
# policy: round_robin          # fcfs, sjf, priority, round_robin, multilevel_queue
# time_quantum_ms: 10          # Round-robin rotation period
#
# Sampling Loop
# -------------
# refresh_interval_ms: 3000    # Process batch cadence
# summary_interval_ms: 1500    # Resource summary cadence
# poll_slice_ms: 200           # Stop/refresh polling granularity
# stale_after_failures: 3      # Failed enumerations before data is marked stale
#
# Termination
# -----------
# termination_timeout_ms: 2000 # Wait after SIGTERM before SIGKILL
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# Testing
# -------
# test_data_file: null         # JSON fixture used instead of /proc
"#;

    format!("{comments}\n{yaml}")
}
