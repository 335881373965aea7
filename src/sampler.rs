//! Background sampling loop.
//!
//! The loop owns the snapshot provider and the state tracker outright and
//! moves them onto the blocking pool for each cycle, so the only shared
//! mutable state is the published batch and summary. Stop requests and
//! force-refresh signals are observed at poll-slice granularity.

use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant as StdInstant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::TrackedProcess;
use crate::config::Config;
use crate::error::SamplerError;
use crate::health_stats::SamplerStats;
use crate::process::host::ProcessHost;
use crate::process::window::WindowOwnership;
use crate::provider::{Acquisition, ProviderSettings, SnapshotProvider};
use crate::scheduler::SchedulingEngine;
use crate::state::{AppState, PublishedBatch, SharedState};
use crate::system::{ResourceProbe, ResourceSummary};
use crate::terminate::{dispatch_termination, ProcessTerminator, SignalTerminator, TerminationOutcome};
use crate::tracker::ProcessStateTracker;

/// Provider and tracker, driven together once per cycle.
pub struct Pipeline {
    provider: SnapshotProvider,
    tracker: ProcessStateTracker,
}

/// Output of one pipeline cycle, before ordering.
#[derive(Debug)]
pub struct CycleOutput {
    pub acquisition: Acquisition,
    pub tracked: Vec<TrackedProcess>,
}

impl Pipeline {
    pub fn new(provider: SnapshotProvider, tracker: ProcessStateTracker) -> Self {
        Self { provider, tracker }
    }

    /// Acquire then annotate. Blocks for the provider's warm-up interval.
    pub fn cycle(&mut self, max_count: usize, apps_only: bool, force: bool) -> CycleOutput {
        if force {
            self.provider.invalidate_cache();
        }
        let acquisition = self.provider.acquire(max_count, apps_only);
        let tracked = self
            .tracker
            .update(&acquisition.processes, StdInstant::now());
        CycleOutput {
            acquisition,
            tracked,
        }
    }

    pub fn tracker(&self) -> &ProcessStateTracker {
        &self.tracker
    }
}

/// Builder for the sampling loop.
pub struct Sampler {
    config: Arc<Config>,
    host: Arc<dyn ProcessHost>,
    windows: Arc<dyn WindowOwnership>,
    probe: Option<ResourceProbe>,
    terminator: Arc<dyn ProcessTerminator>,
}

impl Sampler {
    pub fn new(
        config: Arc<Config>,
        host: Arc<dyn ProcessHost>,
        windows: Arc<dyn WindowOwnership>,
    ) -> Self {
        let terminator = Arc::new(SignalTerminator::new(config.termination_timeout()));
        Self {
            config,
            host,
            windows,
            probe: Some(ResourceProbe::default()),
            terminator,
        }
    }

    pub fn with_resource_probe(mut self, probe: Option<ResourceProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_terminator(mut self, terminator: Arc<dyn ProcessTerminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Starts the loop on the current tokio runtime.
    pub fn spawn(self) -> SamplerHandle {
        let started = StdInstant::now();
        let stats = Arc::new(SamplerStats::new());
        let state: SharedState = Arc::new(AppState::new(self.config.clone(), stats.clone(), started));

        let provider = SnapshotProvider::new(
            self.host,
            self.windows,
            ProviderSettings::from_config(&self.config),
            stats,
        );
        let pipeline = Pipeline::new(provider, ProcessStateTracker::new(started));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(state.clone(), pipeline, self.probe, shutdown_rx));

        info!(
            "Sampler started (policy: {}, refresh every {:?}, summary every {:?})",
            state.engine.policy(),
            self.config.refresh_interval(),
            self.config.summary_interval()
        );

        SamplerHandle {
            state,
            shutdown: shutdown_tx,
            task: Some(task),
            terminator: self.terminator,
        }
    }
}

/// Consumer side of a running sampler.
pub struct SamplerHandle {
    state: SharedState,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    terminator: Arc<dyn ProcessTerminator>,
}

impl SamplerHandle {
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.state.engine
    }

    pub fn stats(&self) -> Arc<SamplerStats> {
        self.state.stats.clone()
    }

    pub fn subscribe_batches(&self) -> watch::Receiver<Option<Arc<PublishedBatch>>> {
        self.state.batches.subscribe()
    }

    pub fn latest_batch(&self) -> Option<Arc<PublishedBatch>> {
        self.state.latest_batch()
    }

    pub fn subscribe_summaries(&self) -> watch::Receiver<Option<Arc<ResourceSummary>>> {
        self.state.summaries.subscribe()
    }

    pub fn latest_summary(&self) -> Option<Arc<ResourceSummary>> {
        self.state.latest_summary()
    }

    /// Asks for one extra cycle as soon as possible. Advisory; repeated
    /// requests before the loop wakes collapse into one.
    pub fn request_refresh(&self) {
        self.state.refresh.notify_one();
    }

    pub fn set_apps_only(&self, apps_only: bool) {
        self.state.apps_only.store(apps_only, Ordering::Relaxed);
    }

    pub fn set_max_processes(&self, max_processes: usize) {
        self.state
            .max_processes
            .store(max_processes, Ordering::Relaxed);
    }

    /// Terminates `pid` off the sampling loop. `on_done` runs on the blocking
    /// pool once the outcome is known, after which a refresh is requested.
    pub fn terminate<F>(&self, pid: u32, on_done: F) -> JoinHandle<()>
    where
        F: FnOnce(TerminationOutcome) + Send + 'static,
    {
        let state = self.state.clone();
        dispatch_termination(self.terminator.clone(), pid, move |outcome| {
            state.stats.record_termination(outcome.success);
            if !outcome.success {
                warn!("Termination of {} failed: {}", outcome.pid, outcome.reason);
            }
            on_done(outcome);
            state.refresh.notify_one();
        })
    }

    /// Requests a cooperative stop and waits for the loop to quiesce.
    pub async fn stop(&mut self) -> Result<(), SamplerError> {
        let task = self.task.take().ok_or(SamplerError::Stopped)?;
        let _ = self.shutdown.send(true);
        task.await?;
        info!("Sampler stopped");
        Ok(())
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run_loop(
    state: SharedState,
    pipeline: Pipeline,
    probe: Option<ResourceProbe>,
    mut shutdown: watch::Receiver<bool>,
) {
    let refresh_interval = state.config.refresh_interval();
    let summary_interval = state.config.summary_interval();
    let poll_slice = state.config.poll_slice();

    let mut pipeline = Some(pipeline);
    let mut probe = probe;
    let mut next_batch = Instant::now();
    let mut next_summary = Instant::now();
    let mut force = false;
    let mut was_stale = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let now = Instant::now();
        if force || now >= next_batch {
            let Some(p) = pipeline.take() else {
                break;
            };
            match run_cycle(&state, p, force, &mut was_stale).await {
                Ok(p) => pipeline = Some(p),
                Err(e) => {
                    error!("Sampling cycle aborted: {}", e);
                    break;
                }
            }
            force = false;
            next_batch = Instant::now() + refresh_interval;
        }

        if probe.is_some() && Instant::now() >= next_summary {
            probe = publish_summary(&state, probe).await;
            next_summary = Instant::now() + summary_interval;
        }

        let mut due = next_batch;
        if probe.is_some() {
            due = due.min(next_summary);
        }
        let wait = due
            .saturating_duration_since(Instant::now())
            .min(poll_slice);

        tokio::select! {
            _ = state.refresh.notified() => {
                debug!("Force refresh requested");
                force = true;
            }
            _ = sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Sampling loop exited");
}

#[instrument(skip(state, pipeline, was_stale))]
async fn run_cycle(
    state: &SharedState,
    mut pipeline: Pipeline,
    force: bool,
    was_stale: &mut bool,
) -> Result<Pipeline, SamplerError> {
    let started = Instant::now();
    let max_count = state.max_processes();
    let apps_only = state.apps_only();

    let (pipeline, output) = tokio::task::spawn_blocking(move || {
        let output = pipeline.cycle(max_count, apps_only, force);
        (pipeline, output)
    })
    .await?;

    let stale = state.stats.is_stale(state.config.stale_after_failures());
    if stale && !*was_stale {
        error!(
            "Process enumeration failed {} cycles in a row, published data is stale",
            state
                .stats
                .consecutive_enumeration_failures
                .load(Ordering::Relaxed)
        );
    } else if !stale && *was_stale {
        info!("Process enumeration recovered");
    }
    *was_stale = stale;

    let policy = state.engine.policy();
    let processes = state.engine.order(&output.tracked);
    let sequence = state
        .batches
        .borrow()
        .as_ref()
        .map(|b| b.sequence + 1)
        .unwrap_or(1);

    let batch = PublishedBatch {
        sequence,
        generated_at: Utc::now(),
        policy,
        processes,
        degraded: output.acquisition.degraded,
        stale,
        from_cache: output.acquisition.from_cache,
    };
    let count = batch.processes.len();
    state.batches.send_replace(Some(Arc::new(batch)));

    let elapsed = started.elapsed();
    state.stats.record_cycle(elapsed.as_secs_f64());
    debug!(
        "Published batch {} with {} processes in {:.3}s",
        sequence,
        count,
        elapsed.as_secs_f64()
    );

    Ok(pipeline)
}

/// Samples host load on the blocking pool. A failed read publishes nothing.
async fn publish_summary(state: &SharedState, probe: Option<ResourceProbe>) -> Option<ResourceProbe> {
    let mut probe = probe?;
    let result = tokio::task::spawn_blocking(move || {
        let summary = probe.sample();
        (probe, summary)
    })
    .await;

    match result {
        Ok((probe, Ok(summary))) => {
            state.summaries.send_replace(Some(Arc::new(summary)));
            Some(probe)
        }
        Ok((probe, Err(e))) => {
            debug!("Resource summary unavailable this tick: {}", e);
            Some(probe)
        }
        Err(e) => {
            warn!("Resource summary task failed, disabling summaries: {}", e);
            None
        }
    }
}
