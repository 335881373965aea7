//! Error types for host introspection and the sampling loop.

use std::io;

/// Failure reading from the host process table.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("process {0} no longer exists")]
    NotFound(u32),

    #[error("access denied reading process {0}")]
    PermissionDenied(u32),

    #[error("malformed {what} for process {pid}")]
    Malformed { pid: u32, what: &'static str },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("process enumeration unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    /// Maps an I/O error on a per-process file to the matching variant.
    pub fn from_io(pid: u32, path: impl Into<String>, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => HostError::NotFound(pid),
            io::ErrorKind::PermissionDenied => HostError::PermissionDenied(pid),
            _ => HostError::Io {
                path: path.into(),
                source: err,
            },
        }
    }

    /// True for faults scoped to a single process (vanished, denied, garbled),
    /// which are skipped rather than failing the whole acquisition.
    pub fn is_transient(&self) -> bool {
        !matches!(self, HostError::Unavailable(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, HostError::PermissionDenied(_))
    }
}

/// Failure of the sampling loop itself.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("sampling cycle panicked or was cancelled: {0}")]
    CycleJoin(#[from] tokio::task::JoinError),

    #[error("sampling loop has already stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_kinds() {
        let e = HostError::from_io(7, "/proc/7/stat", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(e, HostError::NotFound(7)));

        let e = HostError::from_io(
            7,
            "/proc/7/exe",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(e.is_permission_denied());

        let e = HostError::from_io(7, "/proc/7/status", io::Error::other("boom"));
        assert!(matches!(e, HostError::Io { .. }));
        assert!(e.to_string().contains("/proc/7/status"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(HostError::NotFound(1).is_transient());
        assert!(HostError::Malformed { pid: 1, what: "stat" }.is_transient());
        assert!(!HostError::Unavailable("no /proc".into()).is_transient());
    }
}
