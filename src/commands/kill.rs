//! Kill command implementation.
//!
//! Terminates one process through the same off-loop dispatch the sampler uses.

use herakles_proc_scheduler::config::Config;
use herakles_proc_scheduler::{dispatch_termination, SignalTerminator};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Terminates `pid` and prints the outcome; exits 1 on failure.
pub async fn command_kill(pid: u32, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let terminator = Arc::new(SignalTerminator::new(config.termination_timeout()));
    let (tx, rx) = oneshot::channel();

    dispatch_termination(terminator, pid, move |outcome| {
        let _ = tx.send(outcome);
    })
    .await?;
    let outcome = rx.await?;

    if outcome.success {
        println!("✅ Process {}: {}", outcome.pid, outcome.reason);
        Ok(())
    } else {
        eprintln!("❌ Process {}: {}", outcome.pid, outcome.reason);
        std::process::exit(1);
    }
}
