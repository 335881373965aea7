//! CLI command implementations for herakles-proc-scheduler.
//!
//! This module provides implementations for all CLI subcommands:
//! - `snapshot`: One ordered acquisition
//! - `watch`: Live sampling loop
//! - `kill`: Process termination
//! - `policies`: Scheduling policy listing
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `generate`: Test data generation

pub mod check;
pub mod config;
pub mod generate;
pub mod kill;
pub mod policies;
pub mod snapshot;
pub mod watch;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use kill::command_kill;
pub use policies::command_policies;
pub use snapshot::command_snapshot;
pub use watch::command_watch;

use herakles_proc_scheduler::config::Config;
use herakles_proc_scheduler::{
    FixtureHost, NoWindowSystem, ProcessHost, ProcfsHost, WindowOwnership, WmctrlWindows,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Host and window backends selected by the configuration.
pub fn build_backends(
    config: &Config,
) -> Result<(Arc<dyn ProcessHost>, Arc<dyn WindowOwnership>), Box<dyn std::error::Error>> {
    if let Some(test_file) = &config.test_data_file {
        info!("Using test data from file: {}", test_file.display());
        let fixture = Arc::new(FixtureHost::from_file(test_file)?);
        let host: Arc<dyn ProcessHost> = fixture.clone();
        let windows: Arc<dyn WindowOwnership> = fixture;
        return Ok((host, windows));
    }

    // apps_only can be switched on at runtime, so the backend does not depend on it
    let windows: Arc<dyn WindowOwnership> = if wmctrl_available() {
        Arc::new(WmctrlWindows)
    } else {
        Arc::new(NoWindowSystem)
    };
    let host: Arc<dyn ProcessHost> = Arc::new(ProcfsHost::default());
    Ok((host, windows))
}

fn wmctrl_available() -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| Path::new(&dir).join("wmctrl").is_file()))
        .unwrap_or(false)
}
