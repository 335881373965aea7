//! Watch command implementation.
//!
//! Runs the sampling loop and prints each published batch and resource
//! summary until Ctrl+C, SIGTERM, or the requested number of batches.
//! SIGUSR1 toggles the visible-app filter of the running sampler.

use herakles_proc_scheduler::config::Config;
use herakles_proc_scheduler::{
    PublishedBatch, ResourceSummary, Sampler, SchedulingPolicy, TrackedProcess,
};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use super::build_backends;
use super::snapshot::render_process_table;

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Runs the sampling loop in the foreground.
pub async fn command_watch(
    cycles: Option<u64>,
    json: bool,
    show_stats: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (host, windows) = build_backends(config)?;
    let mut handle = Sampler::new(Arc::new(config.clone()), host, windows).spawn();

    let mut batches = handle.subscribe_batches();
    let mut summaries = handle.subscribe_summaries();
    let mut toggle_scope =
        signal::unix::signal(signal::unix::SignalKind::user_defined1())?;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut printed: u64 = 0;
    loop {
        tokio::select! {
            changed = batches.changed() => {
                if changed.is_err() {
                    break;
                }
                let batch = batches.borrow_and_update().clone();
                let Some(batch) = batch else { continue };

                let engine = handle.engine();
                print_batch(&batch, engine.policy(), &engine.order(&batch.processes), json)?;
                if show_stats && !json {
                    println!("{}", handle.stats().render_table());
                }

                printed += 1;
                if cycles.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            changed = summaries.changed() => {
                if changed.is_err() {
                    break;
                }
                let summary = summaries.borrow_and_update().clone();
                if let Some(summary) = summary {
                    print_summary(&summary, json)?;
                }
            }
            Some(()) = toggle_scope.recv() => {
                let apps_only = !handle.state().apps_only();
                info!("Received SIGUSR1, visible-app filter {}", if apps_only { "on" } else { "off" });
                handle.set_apps_only(apps_only);
                handle.request_refresh();
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    handle.stop().await?;
    info!("Watch finished after {} batches", printed);
    Ok(())
}

fn print_batch(
    batch: &PublishedBatch,
    policy: SchedulingPolicy,
    ordered: &[TrackedProcess],
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let view = PublishedBatch {
            policy,
            processes: ordered.to_vec(),
            ..batch.clone()
        };
        println!("{}", serde_json::to_string(&view)?);
        return Ok(());
    }

    println!(
        "\n── batch #{} at {} ({} processes{}{}) ──",
        batch.sequence,
        batch.generated_at.format("%H:%M:%S"),
        ordered.len(),
        if batch.degraded { ", reduced listing" } else { "" },
        if batch.stale { ", STALE" } else { "" }
    );
    print!("{}", render_process_table(ordered, policy));
    Ok(())
}

fn print_summary(summary: &ResourceSummary, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        println!(
            "CPU {:5.1}%  MEM {:.0}/{:.0} MB ({:.1}%)",
            summary.cpu_percent,
            summary.memory_used_bytes as f64 / 1024.0 / 1024.0,
            summary.memory_total_bytes as f64 / 1024.0 / 1024.0,
            summary.memory_percent
        );
    }
    Ok(())
}
