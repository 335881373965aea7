//! Herakles Process Scheduler Library
//!
//! A live, periodically refreshed view of host processes, ordered by a
//! selectable classical CPU-scheduling discipline. The ordering is advisory:
//! it visualizes how FCFS, SJF, Priority, Round Robin or a Multilevel Queue
//! would line the current process table up, without touching OS scheduling.
//!
//! # Pipeline
//!
//! - **SnapshotProvider**: throttled, cached sampling of the process table,
//!   optionally narrowed to processes owning a visible window
//! - **ProcessStateTracker**: arrival time, smoothed priority and sequence
//!   number carried across samples
//! - **SchedulingEngine**: orders a tracked batch under the active policy
//! - **Sampler**: background loop publishing complete batches and resource
//!   summaries through `tokio::sync::watch`
//!
//! # Usage
//!
//! ```no_run
//! use herakles_proc_scheduler::{Config, NoWindowSystem, ProcfsHost, Sampler, SchedulingPolicy};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let mut handle = Sampler::new(
//!     Arc::new(Config::default()),
//!     Arc::new(ProcfsHost::default()),
//!     Arc::new(NoWindowSystem),
//! )
//! .spawn();
//!
//! handle.engine().set_policy(SchedulingPolicy::Sjf);
//! let mut batches = handle.subscribe_batches();
//! if batches.changed().await.is_ok() {
//!     if let Some(batch) = batches.borrow().clone() {
//!         for p in handle.engine().order(&batch.processes) {
//!             println!("{} {} {:.1}%", p.pid(), p.snapshot.name, p.cpu_percent());
//!         }
//!     }
//! }
//! handle.stop().await.ok();
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod health_stats;
pub mod process;
pub mod provider;
pub mod sampler;
pub mod scheduler;
pub mod state;
pub mod system;
pub mod terminate;
pub mod tracker;

// Re-export main types for convenience
pub use cache::{AcquisitionCache, AcquisitionKey, ProcessSnapshot, TrackedProcess};
pub use config::{Config, ConfigFormat};
pub use error::{HostError, SamplerError};
pub use health_stats::SamplerStats;
pub use process::{
    FixtureHost, FixtureProcess, NoWindowSystem, ProcessHost, ProcfsHost, StaticWindowOwners,
    WindowOwnership, WmctrlWindows,
};
pub use provider::{Acquisition, ProviderSettings, SnapshotProvider};
pub use sampler::{Pipeline, Sampler, SamplerHandle};
pub use scheduler::{order_processes, SchedulerConfig, SchedulingEngine, SchedulingPolicy};
pub use state::PublishedBatch;
pub use system::{ResourceProbe, ResourceSummary};
pub use terminate::{dispatch_termination, ProcessTerminator, SignalTerminator, TerminationOutcome};
pub use tracker::ProcessStateTracker;
