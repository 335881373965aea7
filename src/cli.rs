//! CLI arguments and subcommands for herakles-proc-scheduler.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands, and merges CLI overrides into
//! the loaded configuration.

use clap::{Parser, Subcommand, ValueEnum};
use herakles_proc_scheduler::config::{load_config, Config, ConfigFormat};
use herakles_proc_scheduler::SchedulingPolicy;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-scheduler",
    about = "Live process table ordered by classical CPU-scheduling policies",
    long_about = "Live process table ordered by classical CPU-scheduling policies.\n\n\
                  Samples the host process table on a fixed cadence, tracks arrival time and \
                  smoothed priority per process, and orders each batch as FCFS, SJF, Priority, \
                  Round Robin or Multilevel Queue would. The ordering is a visualization only.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "Project: https://github.com/cansp-dev/herakles-proc-scheduler | More info: https://www.herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Maximum number of processes per batch (0 = unlimited)
    #[arg(short = 'n', long)]
    pub max_processes: Option<usize>,

    /// Only show processes owning a visible window
    #[arg(long, conflicts_with = "all_processes")]
    pub apps_only: bool,

    /// Show every process, not just windowed applications
    #[arg(long, conflicts_with = "apps_only")]
    pub all_processes: bool,

    /// Scheduling policy (fcfs, sjf, priority, round_robin/rr, multilevel_queue/mlq)
    #[arg(short = 'p', long)]
    pub policy: Option<SchedulingPolicy>,

    /// Round-robin time quantum in milliseconds
    #[arg(short = 'q', long)]
    pub time_quantum_ms: Option<u64>,

    /// Acquisition cache validity window in milliseconds
    #[arg(long)]
    pub cache_ttl_ms: Option<u64>,

    /// Process batch refresh interval in milliseconds
    #[arg(long)]
    pub refresh_interval_ms: Option<u64>,

    /// Include only processes matching these names (comma-separated)
    #[arg(long)]
    pub include_names: Option<String>,

    /// Exclude processes matching these names (comma-separated)
    #[arg(long)]
    pub exclude_names: Option<String>,

    /// Parallel processing threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Path to JSON test data file (uses a synthetic process table instead of /proc)
    #[arg(short = 't', long)]
    pub test_data_file: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Take one snapshot, order it and print it
    Snapshot {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Show only the first N rows
        #[arg(long)]
        top: Option<usize>,
    },

    /// Run the sampling loop and print every batch (default command)
    Watch {
        /// Stop after this many batches
        #[arg(long)]
        cycles: Option<u64>,

        /// Print JSON lines instead of tables
        #[arg(long)]
        json: bool,

        /// Print sampler statistics after each batch
        #[arg(long)]
        stats: bool,
    },

    /// Terminate a process (SIGTERM, then SIGKILL after the timeout)
    Kill {
        /// Process id
        pid: u32,
    },

    /// List scheduling policies
    Policies {
        /// Show descriptions
        #[arg(short = 'v', long)]
        verbose: bool,
    },

    /// Validate configuration and /proc access
    Check,

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Generate synthetic test data JSON file
    GenerateTestdata {
        /// Output file path
        #[arg(short = 'o', long, default_value = "testdata.json")]
        output: PathBuf,

        /// Number of processes to generate
        #[arg(long, default_value_t = 40)]
        count: usize,

        /// Fraction of processes owning a visible window (0.0 - 1.0)
        #[arg(long, default_value_t = 0.3)]
        windowed_ratio: f64,
    },
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves the effective configuration: CLI > config file > defaults.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    if args.max_processes.is_some() {
        config.max_processes = args.max_processes;
    }
    if args.apps_only {
        config.apps_only = Some(true);
    }
    if args.all_processes {
        config.apps_only = Some(false);
    }
    if args.policy.is_some() {
        config.policy = args.policy;
    }
    if args.time_quantum_ms.is_some() {
        config.time_quantum_ms = args.time_quantum_ms;
    }
    if args.cache_ttl_ms.is_some() {
        config.cache_ttl_ms = args.cache_ttl_ms;
    }
    if args.refresh_interval_ms.is_some() {
        config.refresh_interval_ms = args.refresh_interval_ms;
    }

    // Parse comma-separated include/exclude names
    if let Some(include_str) = &args.include_names {
        config.include_names = Some(split_names(include_str));
    }
    if let Some(exclude_str) = &args.exclude_names {
        config.exclude_names = Some(split_names(exclude_str));
    }

    if args.parallelism.is_some() {
        config.parallelism = args.parallelism;
    }

    // Test data file: CLI wins if provided
    if let Some(test_file) = &args.test_data_file {
        config.test_data_file = Some(test_file.clone());
    }

    config.log_level = Some(format!("{:?}", args.log_level).to_lowercase());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let args = Args::parse_from([
            "herakles-proc-scheduler",
            "--no-config",
            "--all-processes",
            "-p",
            "mlq",
            "-q",
            "40",
            "--exclude-names",
            "kworker, ,migration",
        ]);
        let cfg = resolve_config(&args).expect("resolve");
        assert!(!cfg.apps_only());
        assert_eq!(cfg.policy(), SchedulingPolicy::MultilevelQueue);
        assert_eq!(cfg.time_quantum_ms(), 40);
        assert_eq!(
            cfg.exclude_names,
            Some(vec!["kworker".to_string(), "migration".to_string()])
        );
        assert_eq!(cfg.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn test_subcommand_parsing() {
        let args = Args::parse_from(["herakles-proc-scheduler", "kill", "1234"]);
        assert!(matches!(args.command, Some(Commands::Kill { pid: 1234 })));

        let args = Args::parse_from(["herakles-proc-scheduler", "watch", "--cycles", "3"]);
        assert!(matches!(
            args.command,
            Some(Commands::Watch {
                cycles: Some(3),
                ..
            })
        ));
    }

    #[test]
    fn test_conflicting_scope_flags() {
        let res = Args::try_parse_from([
            "herakles-proc-scheduler",
            "--apps-only",
            "--all-processes",
        ]);
        assert!(res.is_err());
    }
}
