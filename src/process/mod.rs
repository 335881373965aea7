//! Process-related modules for host introspection.
//!
//! This module provides:
//! - `scanner`: Process discovery and filtering
//! - `cpu`: CPU time parsing and delta-based usage
//! - `memory`: Resident memory parsing
//! - `host`: The host process-table surface and its backends
//! - `window`: Visible top-level window ownership

pub mod cpu;
pub mod host;
pub mod memory;
pub mod scanner;
pub mod window;

// Re-export commonly used types
pub use cpu::{cpu_percent_between, CpuCache, CLK_TCK};
pub use host::{
    load_fixture_from_file, FixtureData, FixtureHost, FixtureProcess, ProcessDetails,
    ProcessHost, ProcfsHost,
};
pub use memory::{bytes_to_mb, round1};
pub use scanner::{collect_proc_entries, read_process_name, should_include_process};
pub use window::{NoWindowSystem, StaticWindowOwners, WindowOwnership, WmctrlWindows};
