//! Process scanning utilities for discovering and reading process entries from /proc.
//!
//! This module provides functions to scan the /proc filesystem for process entries
//! and read process information like names and executable paths.

use crate::config::Config;
use crate::error::HostError;
use std::fs;
use std::path::{Path, PathBuf};

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// Scans a /proc-like directory for process entries with numeric PIDs.
///
/// Fails only when the directory itself cannot be read; unreadable entries
/// are skipped.
pub fn collect_proc_entries(root: &Path) -> Result<Vec<ProcEntry>, HostError> {
    let entries = fs::read_dir(root)
        .map_err(|e| HostError::Unavailable(format!("cannot read {}: {}", root.display(), e)))?;

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let p = entry.path();
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !p.join("stat").exists() {
            continue;
        }
        let pid: u32 = match name.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        out.push(ProcEntry { pid, proc_path: p });
    }
    out.sort_by_key(|e| e.pid);
    Ok(out)
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        if !content.is_empty() {
            let parts: Vec<&str> = content
                .split(|&b| b == 0u8)
                .filter_map(|s| std::str::from_utf8(s).ok())
                .collect();
            if !parts.is_empty() {
                if let Some(name) = Path::new(parts[0]).file_name() {
                    return name.to_str().map(|s| s.to_string());
                }
            }
        }
    }
    None
}

/// Resolves the executable path; empty when the link is unreadable
/// (kernel threads, other users' processes without privileges).
pub fn read_exe_path(proc_path: &Path) -> String {
    fs::read_link(proc_path.join("exe"))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Determines if a process should be included based on configuration filters.
pub fn should_include_process(name: &str, cfg: &Config) -> bool {
    if let Some(ex) = &cfg.exclude_names {
        if ex.iter().any(|s| name.contains(s)) {
            return false;
        }
    }
    if let Some(inc) = &cfg.include_names {
        if !inc.is_empty() {
            return inc.iter().any(|s| name.contains(s));
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // -------------------------------------------------------------------------
    // Tests for collect_proc_entries
    // -------------------------------------------------------------------------

    #[test]
    fn test_collect_proc_entries_numeric_only() {
        let dir = tempdir().expect("Failed to create temp dir");
        for name in ["12", "3", "self", "sys"] {
            let p = dir.path().join(name);
            std::fs::create_dir(&p).expect("mkdir");
            std::fs::write(p.join("stat"), "x").expect("write stat");
        }
        // numeric but without stat: skipped
        std::fs::create_dir(dir.path().join("77")).expect("mkdir");

        let entries = collect_proc_entries(dir.path()).expect("scan failed");
        let pids: Vec<u32> = entries.iter().map(|e| e.pid).collect();
        assert_eq!(pids, vec![3, 12]);
    }

    #[test]
    fn test_collect_proc_entries_missing_root() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = collect_proc_entries(&dir.path().join("nope")).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_read_process_name_comm_then_cmdline() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("cmdline"), b"/usr/bin/python3\0-m\0http.server\0")
            .expect("write cmdline");
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("python3"));

        std::fs::write(dir.path().join("comm"), "nginx\n").expect("write comm");
        assert_eq!(read_process_name(dir.path()).as_deref(), Some("nginx"));
    }

    #[test]
    fn test_read_exe_path_missing_is_empty() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert_eq!(read_exe_path(dir.path()), "");
    }

    // -------------------------------------------------------------------------
    // Tests for should_include_process
    // -------------------------------------------------------------------------

    #[test]
    fn test_should_include_process_no_filters() {
        let cfg = Config::default();
        assert!(should_include_process("nginx", &cfg));
        assert!(should_include_process("any_process", &cfg));
    }

    #[test]
    fn test_should_include_process_with_include() {
        let cfg = Config {
            include_names: Some(vec!["nginx".to_string(), "postgres".to_string()]),
            ..Config::default()
        };

        assert!(should_include_process("nginx-worker", &cfg));
        assert!(should_include_process("postgres", &cfg));
        assert!(!should_include_process("redis", &cfg));
    }

    #[test]
    fn test_should_include_process_exclude_takes_priority() {
        let cfg = Config {
            include_names: Some(vec!["app".to_string()]),
            exclude_names: Some(vec!["test".to_string()]),
            ..Config::default()
        };

        assert!(!should_include_process("test_app", &cfg));
        assert!(should_include_process("prod_app", &cfg));
    }
}
