//! Visible top-level window ownership.
//!
//! Window ownership is a best-effort capability: backends return `None` when
//! the host cannot say which processes own windows, and the visible-app filter
//! then passes every process through.

use ahash::AHashSet;
use std::process::Command;
use tracing::debug;

/// Reports which pids own at least one visible, titled top-level window.
pub trait WindowOwnership: Send + Sync {
    /// `None` when window ownership is unavailable on this host.
    fn visible_window_pids(&self) -> Option<AHashSet<u32>>;
}

/// Host without a window system (servers, containers).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWindowSystem;

impl WindowOwnership for NoWindowSystem {
    fn visible_window_pids(&self) -> Option<AHashSet<u32>> {
        None
    }
}

/// EWMH window list via `wmctrl -lp` on X11 desktops.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmctrlWindows;

impl WindowOwnership for WmctrlWindows {
    fn visible_window_pids(&self) -> Option<AHashSet<u32>> {
        let output = match Command::new("wmctrl").arg("-lp").output() {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                debug!("wmctrl exited with {}, window filter unsupported", o.status);
                return None;
            }
            Err(e) => {
                debug!("wmctrl unavailable ({}), window filter unsupported", e);
                return None;
            }
        };
        Some(parse_wmctrl_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses `wmctrl -lp` lines: `<id> <desktop> <pid> <host> <title...>`.
///
/// Windows without a title or with pid 0 (no _NET_WM_PID) are ignored.
pub fn parse_wmctrl_output(out: &str) -> AHashSet<u32> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let _id = parts.next()?;
            let _desktop = parts.next()?;
            let pid: u32 = parts.next()?.parse().ok()?;
            let _host = parts.next()?;
            let has_title = parts.next().is_some();
            (pid > 0 && has_title).then_some(pid)
        })
        .collect()
}

/// Fixed set of owners, for hosts whose window list is known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticWindowOwners(pub Option<AHashSet<u32>>);

impl WindowOwnership for StaticWindowOwners {
    fn visible_window_pids(&self) -> Option<AHashSet<u32>> {
        self.0.clone()
    }
}
