//! Process termination capability.
//!
//! Termination never raises: every attempt ends in a `TerminationOutcome`
//! with a free-text reason. Dispatch runs on the blocking pool so a slow
//! shutdown of the target never stalls the sampling loop.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const REASON_TERMINATED: &str = "terminated";
pub const REASON_KILLED: &str = "killed";
pub const REASON_NO_SUCH_PROCESS: &str = "no such process";
pub const REASON_PERMISSION_DENIED: &str = "permission denied";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationOutcome {
    pub pid: u32,
    pub success: bool,
    pub reason: String,
}

impl TerminationOutcome {
    pub fn ok(pid: u32, reason: &str) -> Self {
        Self {
            pid,
            success: true,
            reason: reason.to_string(),
        }
    }

    pub fn failed(pid: u32, reason: impl Into<String>) -> Self {
        Self {
            pid,
            success: false,
            reason: reason.into(),
        }
    }
}

pub trait ProcessTerminator: Send + Sync {
    fn terminate(&self, pid: u32) -> TerminationOutcome;
}

/// SIGTERM, wait, then SIGKILL.
#[derive(Debug, Clone)]
pub struct SignalTerminator {
    timeout: Duration,
    poll_interval: Duration,
    proc_root: PathBuf,
}

impl SignalTerminator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(50),
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Gone means the kernel no longer knows the pid, or only a zombie is left.
    fn is_gone(&self, pid: Pid) -> bool {
        if let Err(Errno::ESRCH) = kill(pid, None) {
            return true;
        }
        let stat_path = self.proc_root.join(pid.to_string()).join("stat");
        match fs::read_to_string(stat_path) {
            Ok(content) => process_state(&content) == Some('Z'),
            Err(_) => true,
        }
    }

    fn wait_for_exit(&self, pid: Pid) -> bool {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.is_gone(pid) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_TERMINATION_TIMEOUT_MS))
    }
}

fn signal_error(pid: u32, err: Errno) -> TerminationOutcome {
    match err {
        Errno::ESRCH => TerminationOutcome::failed(pid, REASON_NO_SUCH_PROCESS),
        Errno::EPERM => TerminationOutcome::failed(pid, REASON_PERMISSION_DENIED),
        other => TerminationOutcome::failed(pid, other.desc()),
    }
}

/// Single-character state field of a `/proc/<pid>/stat` line.
fn process_state(stat: &str) -> Option<char> {
    let after = &stat[stat.rfind(')')? + 1..];
    after.split_whitespace().next()?.chars().next()
}

impl ProcessTerminator for SignalTerminator {
    fn terminate(&self, pid: u32) -> TerminationOutcome {
        if pid == 0 || pid > i32::MAX as u32 {
            return TerminationOutcome::failed(pid, "invalid pid");
        }
        if pid == std::process::id() {
            return TerminationOutcome::failed(pid, "refusing to terminate own process");
        }
        let target = Pid::from_raw(pid as i32);

        if let Err(e) = kill(target, Signal::SIGTERM) {
            debug!("SIGTERM to {} failed: {}", pid, e);
            return signal_error(pid, e);
        }
        if self.wait_for_exit(target) {
            info!("Process {} terminated", pid);
            return TerminationOutcome::ok(pid, REASON_TERMINATED);
        }

        warn!(
            "Process {} still running after {:?}, sending SIGKILL",
            pid, self.timeout
        );
        match kill(target, Signal::SIGKILL) {
            Ok(()) => {}
            Err(Errno::ESRCH) => return TerminationOutcome::ok(pid, REASON_TERMINATED),
            Err(e) => return signal_error(pid, e),
        }
        if self.wait_for_exit(target) {
            info!("Process {} killed", pid);
            TerminationOutcome::ok(pid, REASON_KILLED)
        } else {
            TerminationOutcome::failed(pid, "process did not exit after SIGKILL")
        }
    }
}

/// Runs `terminator` for `pid` on the blocking pool and hands the outcome to
/// `on_done` from that thread.
pub fn dispatch_termination<F>(
    terminator: Arc<dyn ProcessTerminator>,
    pid: u32,
    on_done: F,
) -> JoinHandle<()>
where
    F: FnOnce(TerminationOutcome) + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let outcome = terminator.terminate(pid);
        on_done(outcome);
    })
}
