//! herakles-proc-scheduler - version 0.1.0
//!
//! Live process table ordered by classical CPU-scheduling policies, with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;

use clap::Parser;
use herakles_proc_scheduler::config::{show_config, validate_effective_config, Config};
use tracing::{debug, error, info, Level};

use cli::{resolve_config, Args, Commands, LogLevel};
use commands::{
    command_check, command_config, command_generate_testdata, command_kill, command_policies,
    command_snapshot, command_watch,
};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) {
    if matches!(args.log_level, LogLevel::Off) {
        return;
    }

    let log_level = match args.log_level {
        LogLevel::Off | LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Configure parallel processing for per-process reads.
fn configure_rayon(config: &Config) {
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
            {
                Ok(()) => debug!("Rayon thread pool configured with {} threads", threads),
                Err(e) => error!("Failed to set rayon thread pool: {}", e),
            }
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Config generation and fixture generation don't need the effective config
    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => return command_config(output.clone(), *format, *commented),
        Some(Commands::GenerateTestdata {
            output,
            count,
            windowed_ratio,
        }) => {
            setup_logging(&args);
            return command_generate_testdata(output.clone(), *count, *windowed_ratio);
        }
        _ => {}
    }

    let config = load_validated_config(&args)?;
    setup_logging(&args);
    configure_rayon(&config);

    match &args.command {
        Some(Commands::Snapshot { json, top }) => command_snapshot(*json, *top, &config),
        Some(Commands::Kill { pid }) => command_kill(*pid, &config).await,
        Some(Commands::Policies { verbose }) => command_policies(*verbose, config.policy()),
        Some(Commands::Check) => command_check(&config),
        Some(Commands::Watch {
            cycles,
            json,
            stats,
        }) => command_watch(*cycles, *json, *stats, &config).await,
        None => {
            info!("Starting herakles-proc-scheduler");
            command_watch(None, false, false, &config).await
        }
        Some(Commands::Config { .. }) => unreachable!("Config handled above"),
        Some(Commands::GenerateTestdata { .. }) => unreachable!("GenerateTestdata handled above"),
    }
}
