//! Host process-table backends.
//!
//! `ProcessHost` is the collaborator surface the snapshot provider samples:
//! pid enumeration, cumulative CPU time, per-process details and a
//! reduced-fidelity listing used when enumeration fails. `ProcfsHost` reads
//! Linux `/proc`; `FixtureHost` serves a JSON process table for tests and demos.

use ahash::AHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::RwLock;
use tracing::{debug, info};

use crate::error::HostError;
use crate::process::cpu::{parse_cpu_time_seconds, parse_start_time_seconds};
use crate::process::memory::read_rss_bytes;
use crate::process::scanner::{collect_proc_entries, read_exe_path, read_process_name};
use crate::process::window::WindowOwnership;

/// Everything the provider needs about one process besides CPU time.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDetails {
    pub name: String,
    pub exe: String,
    pub rss_bytes: u64,
    pub start_time_seconds: Option<f64>,
    /// Ready-made CPU percent for hosts that report it directly.
    pub cpu_percent: Option<f64>,
}

/// Read access to the host process table.
pub trait ProcessHost: Send + Sync {
    /// Lists current pids. An error here means the whole table is unavailable.
    fn enumerate(&self) -> Result<Vec<u32>, HostError>;

    /// Cumulative user+system CPU time of `pid` in seconds.
    fn cpu_time_seconds(&self, pid: u32) -> Result<f64, HostError>;

    fn details(&self, pid: u32) -> Result<ProcessDetails, HostError>;

    /// Pid and name only, through a path independent of `enumerate`.
    fn enumerate_basic(&self) -> Result<Vec<(u32, String)>, HostError>;
}

// -----------------------------------------------------------------------------
// procfs
// -----------------------------------------------------------------------------

/// Linux `/proc` backend.
#[derive(Debug, Clone)]
pub struct ProcfsHost {
    root: PathBuf,
}

impl Default for ProcfsHost {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcfsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pid_path(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl ProcessHost for ProcfsHost {
    fn enumerate(&self) -> Result<Vec<u32>, HostError> {
        let entries = collect_proc_entries(&self.root)?;
        debug!("Collected {} process entries from {}", entries.len(), self.root.display());
        Ok(entries.into_iter().map(|e| e.pid).collect())
    }

    fn cpu_time_seconds(&self, pid: u32) -> Result<f64, HostError> {
        parse_cpu_time_seconds(pid, &self.pid_path(pid))
    }

    fn details(&self, pid: u32) -> Result<ProcessDetails, HostError> {
        let path = self.pid_path(pid);
        if !path.exists() {
            return Err(HostError::NotFound(pid));
        }
        let name = read_process_name(&path).ok_or(HostError::NotFound(pid))?;
        let rss_bytes = read_rss_bytes(pid, &path)?;
        Ok(ProcessDetails {
            name,
            exe: read_exe_path(&path),
            rss_bytes,
            start_time_seconds: parse_start_time_seconds(pid, &path).ok(),
            cpu_percent: None,
        })
    }

    fn enumerate_basic(&self) -> Result<Vec<(u32, String)>, HostError> {
        let output = Command::new("ps")
            .args(["-e", "-o", "pid=,comm="])
            .output()
            .map_err(|e| HostError::Unavailable(format!("failed to run ps: {}", e)))?;
        if !output.status.success() {
            return Err(HostError::Unavailable(format!(
                "ps exited with {}",
                output.status
            )));
        }
        Ok(parse_ps_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses `ps -e -o pid=,comm=` output; unparsable lines are skipped.
pub fn parse_ps_output(out: &str) -> Vec<(u32, String)> {
    out.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, name) = line.split_once(char::is_whitespace)?;
            let pid: u32 = pid.parse().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((pid, name.to_string()))
        })
        .collect()
}

// -----------------------------------------------------------------------------
// fixture
// -----------------------------------------------------------------------------

/// One process in a JSON fixture file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProcess {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub exe: String,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_seconds: Option<f64>,
    /// Title of a visible top-level window owned by the process, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
}

/// Root structure for fixture JSON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureData {
    pub version: String,
    pub generated_at: String,
    pub processes: Vec<FixtureProcess>,
}

/// Load fixture data from a JSON file.
pub fn load_fixture_from_file(path: &Path) -> Result<FixtureData, String> {
    debug!("Loading fixture data from: {}", path.display());

    if !path.exists() {
        return Err(format!("Fixture file not found: {}", path.display()));
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read fixture file: {}", e))?;
    let data: FixtureData = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse fixture JSON: {}", e))?;

    info!(
        "Loaded fixture version {} from {} ({} processes)",
        data.version,
        data.generated_at,
        data.processes.len()
    );

    Ok(data)
}

/// In-memory process table, optionally re-read from a JSON file on every
/// enumeration so edits to the file show up as host changes.
#[derive(Debug, Default)]
pub struct FixtureHost {
    source: Option<PathBuf>,
    table: RwLock<HashMap<u32, FixtureProcess>>,
    order: RwLock<Vec<u32>>,
    enumeration_down: RwLock<bool>,
}

impl FixtureHost {
    pub fn from_processes(processes: Vec<FixtureProcess>) -> Self {
        let host = Self::default();
        host.set_processes(processes);
        host
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let data = load_fixture_from_file(&path)?;
        let host = Self::from_processes(data.processes);
        Ok(Self {
            source: Some(path),
            ..host
        })
    }

    /// Replaces the table; enumeration order follows `processes`.
    pub fn set_processes(&self, processes: Vec<FixtureProcess>) {
        let order: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        let table: HashMap<u32, FixtureProcess> =
            processes.into_iter().map(|p| (p.pid, p)).collect();
        if let Ok(mut guard) = self.table.write() {
            *guard = table;
        }
        if let Ok(mut guard) = self.order.write() {
            *guard = order;
        }
    }

    /// Simulates a host whose full process query fails.
    pub fn set_enumeration_down(&self, down: bool) {
        if let Ok(mut guard) = self.enumeration_down.write() {
            *guard = down;
        }
    }

    fn reload(&self) -> Result<(), HostError> {
        if let Some(path) = &self.source {
            let data = load_fixture_from_file(path).map_err(HostError::Unavailable)?;
            self.set_processes(data.processes);
        }
        Ok(())
    }

    fn lookup(&self, pid: u32) -> Result<FixtureProcess, HostError> {
        let guard = self
            .table
            .read()
            .map_err(|_| HostError::Unavailable("fixture table lock poisoned".into()))?;
        guard.get(&pid).cloned().ok_or(HostError::NotFound(pid))
    }
}

impl ProcessHost for FixtureHost {
    fn enumerate(&self) -> Result<Vec<u32>, HostError> {
        if self.enumeration_down.read().map(|g| *g).unwrap_or(false) {
            return Err(HostError::Unavailable("fixture enumeration disabled".into()));
        }
        self.reload()?;
        self.order
            .read()
            .map(|g| g.clone())
            .map_err(|_| HostError::Unavailable("fixture order lock poisoned".into()))
    }

    fn cpu_time_seconds(&self, pid: u32) -> Result<f64, HostError> {
        self.lookup(pid).map(|_| 0.0)
    }

    fn details(&self, pid: u32) -> Result<ProcessDetails, HostError> {
        let p = self.lookup(pid)?;
        Ok(ProcessDetails {
            name: p.name,
            exe: p.exe,
            rss_bytes: (p.memory_mb.max(0.0) * 1024.0 * 1024.0) as u64,
            start_time_seconds: p.start_time_seconds,
            cpu_percent: Some(p.cpu_percent.max(0.0)),
        })
    }

    fn enumerate_basic(&self) -> Result<Vec<(u32, String)>, HostError> {
        let order = self
            .order
            .read()
            .map_err(|_| HostError::Unavailable("fixture order lock poisoned".into()))?;
        let table = self
            .table
            .read()
            .map_err(|_| HostError::Unavailable("fixture table lock poisoned".into()))?;
        Ok(order
            .iter()
            .filter_map(|pid| table.get(pid).map(|p| (p.pid, p.name.clone())))
            .collect())
    }
}

impl WindowOwnership for FixtureHost {
    fn visible_window_pids(&self) -> Option<ahash::AHashSet<u32>> {
        let table = self.table.read().ok()?;
        if table.values().all(|p| p.window_title.is_none()) {
            return None;
        }
        Some(
            table
                .values()
                .filter(|p| p.window_title.as_deref().is_some_and(|t| !t.is_empty()))
                .map(|p| p.pid)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture(pid: u32, name: &str, cpu: f64, window: Option<&str>) -> FixtureProcess {
        FixtureProcess {
            pid,
            name: name.to_string(),
            exe: format!("/usr/bin/{}", name),
            memory_mb: 10.0,
            cpu_percent: cpu,
            start_time_seconds: None,
            window_title: window.map(str::to_string),
        }
    }

    // -------------------------------------------------------------------------
    // Tests for procfs backend against a fake /proc tree
    // -------------------------------------------------------------------------

    #[test]
    fn test_procfs_host_reads_fake_tree() {
        let dir = tempdir().expect("Failed to create temp dir");
        let p = dir.path().join("42");
        std::fs::create_dir(&p).expect("mkdir");
        std::fs::write(p.join("comm"), "worker\n").expect("write comm");
        std::fs::write(p.join("status"), "Name:\tworker\nVmRSS:\t 4096 kB\n").expect("write status");
        std::fs::write(
            p.join("stat"),
            "42 (worker) S 1 42 42 0 -1 0 0 0 0 0 200 100 0 0 20 0 1 0 500 0 0",
        )
        .expect("write stat");

        let host = ProcfsHost::new(dir.path());
        assert_eq!(host.enumerate().expect("enumerate"), vec![42]);

        let details = host.details(42).expect("details");
        assert_eq!(details.name, "worker");
        assert_eq!(details.rss_bytes, 4096 * 1024);
        assert_eq!(details.exe, "");
        assert!(details.start_time_seconds.is_some());
        assert!(details.cpu_percent.is_none());

        assert!(host.cpu_time_seconds(42).expect("cpu") > 0.0);
        assert!(matches!(host.details(43), Err(HostError::NotFound(43))));
    }

    #[test]
    fn test_parse_ps_output() {
        let out = "    1 systemd\n  123 kworker/0:1-events\nnot-a-pid x\n  77 \n 900 Web Content\n";
        let parsed = parse_ps_output(out);
        assert_eq!(
            parsed,
            vec![
                (1, "systemd".to_string()),
                (123, "kworker/0:1-events".to_string()),
                (900, "Web Content".to_string()),
            ]
        );
    }

    // -------------------------------------------------------------------------
    // Tests for the fixture backend
    // -------------------------------------------------------------------------

    #[test]
    fn test_fixture_host_enumeration_and_details() {
        let host = FixtureHost::from_processes(vec![
            fixture(5, "b", 1.5, None),
            fixture(3, "a", 2.5, Some("Editor")),
        ]);
        assert_eq!(host.enumerate().expect("enumerate"), vec![5, 3]);
        let d = host.details(3).expect("details");
        assert_eq!(d.cpu_percent, Some(2.5));
        assert_eq!(d.rss_bytes, 10 * 1024 * 1024);

        host.set_enumeration_down(true);
        assert!(host.enumerate().is_err());
        assert_eq!(host.enumerate_basic().expect("basic").len(), 2);
    }

    #[test]
    fn test_fixture_window_ownership() {
        let host = FixtureHost::from_processes(vec![
            fixture(1, "shell", 0.0, None),
            fixture(2, "editor", 0.0, Some("main.rs")),
            fixture(3, "tray", 0.0, Some("")),
        ]);
        let pids = host.visible_window_pids().expect("supported");
        assert!(pids.contains(&2));
        assert!(!pids.contains(&3));
        assert_eq!(pids.len(), 1);

        let headless = FixtureHost::from_processes(vec![fixture(1, "shell", 0.0, None)]);
        assert!(headless.visible_window_pids().is_none());
    }

    #[test]
    fn test_fixture_host_from_file_reloads() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fixture.json");
        let write = |procs: Vec<FixtureProcess>| {
            let data = FixtureData {
                version: "1".into(),
                generated_at: "now".into(),
                processes: procs,
            };
            std::fs::write(&path, serde_json::to_string(&data).expect("json")).expect("write");
        };

        write(vec![fixture(1, "a", 0.0, None)]);
        let host = FixtureHost::from_file(&path).expect("load");
        assert_eq!(host.enumerate().expect("enumerate"), vec![1]);

        write(vec![fixture(1, "a", 0.0, None), fixture(2, "b", 0.0, None)]);
        assert_eq!(host.enumerate().expect("enumerate"), vec![1, 2]);
    }

    #[test]
    fn test_load_fixture_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = load_fixture_from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.contains("not found"));
    }
}
