//! Generate testdata command implementation.
//!
//! Generates synthetic process-table fixtures usable via `--test-data-file`.

use chrono::Utc;
use herakles_proc_scheduler::process::{FixtureData, FixtureProcess};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

const DAEMON_NAMES: &[&str] = &[
    "systemd",
    "sshd",
    "cron",
    "dbus-daemon",
    "rsyslogd",
    "containerd",
    "postgres",
    "nginx",
    "redis-server",
    "kworker/0:1",
];

const APP_NAMES: &[(&str, &str)] = &[
    ("firefox", "Mozilla Firefox"),
    ("code", "main.rs - Visual Studio Code"),
    ("gnome-terminal", "Terminal"),
    ("thunderbird", "Inbox - Mozilla Thunderbird"),
    ("libreoffice", "report.odt - LibreOffice Writer"),
    ("slack", "Slack"),
    ("vlc", "VLC media player"),
    ("gimp", "GNU Image Manipulation Program"),
];

/// Generates synthetic fixture data and writes it to `output`.
pub fn command_generate_testdata(
    output: PathBuf,
    count: usize,
    windowed_ratio: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&windowed_ratio) {
        return Err("windowed_ratio must be between 0.0 and 1.0".into());
    }

    info!("Generating {} synthetic processes", count);
    let data = generate_fixture(&mut rand::thread_rng(), count, windowed_ratio);

    // Write to file as pretty-printed JSON
    let json_content = serde_json::to_string_pretty(&data)?;
    fs::write(&output, &json_content)?;

    println!(
        "✅ Generated test data: {} processes in {}",
        data.processes.len(),
        output.display()
    );

    Ok(())
}

/// Builds a fixture with unique pids; roughly `windowed_ratio` of the
/// processes own a titled window.
pub fn generate_fixture(rng: &mut impl Rng, count: usize, windowed_ratio: f64) -> FixtureData {
    let mut pid: u32 = 1;
    let processes = (0..count)
        .map(|i| {
            pid += rng.gen_range(1..40);
            let windowed = rng.gen_bool(windowed_ratio);
            let process = generate_random_process(rng, pid, i, windowed);
            debug!("Generated process {} ({})", process.pid, process.name);
            process
        })
        .collect();

    FixtureData {
        version: "1.0".to_string(),
        generated_at: Utc::now().to_rfc3339(),
        processes,
    }
}

/// Generates a random process with realistic memory and CPU values.
fn generate_random_process(rng: &mut impl Rng, pid: u32, index: usize, windowed: bool) -> FixtureProcess {
    let (name, window_title) = if windowed {
        let (name, title) = APP_NAMES
            .choose(rng)
            .copied()
            .unwrap_or(("app", "Application"));
        (name.to_string(), Some(title.to_string()))
    } else {
        let name = DAEMON_NAMES.choose(rng).copied().unwrap_or("daemon");
        (name.to_string(), None)
    };

    // Memory: 1 MB - 2 GB, skewed towards small processes
    let memory_mb: f64 = rng.gen_range(0.0_f64..1.0).powi(3) * 2048.0 + 1.0;

    // CPU: most processes idle, a few busy
    let cpu_percent: f64 = if rng.gen_bool(0.2) {
        rng.gen_range(5.0..100.0)
    } else {
        rng.gen_range(0.0..5.0)
    };

    // Start time: seconds since boot, later pids started later
    let start_time_seconds = index as f64 * 2.5 + rng.gen_range(0.0..2.0);

    FixtureProcess {
        pid,
        exe: format!("/usr/bin/{}", name),
        name,
        memory_mb: (memory_mb * 10.0).round() / 10.0,
        cpu_percent: (cpu_percent * 10.0).round() / 10.0,
        start_time_seconds: Some(start_time_seconds),
        window_title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashSet;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_fixture_unique_pids() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = generate_fixture(&mut rng, 200, 0.3);
        assert_eq!(data.processes.len(), 200);

        let pids: AHashSet<u32> = data.processes.iter().map(|p| p.pid).collect();
        assert_eq!(pids.len(), 200);
        assert!(data
            .processes
            .iter()
            .all(|p| p.cpu_percent >= 0.0 && p.memory_mb >= 1.0));
    }

    #[test]
    fn test_generate_fixture_window_ratio_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        let none = generate_fixture(&mut rng, 20, 0.0);
        assert!(none.processes.iter().all(|p| p.window_title.is_none()));

        let all = generate_fixture(&mut rng, 20, 1.0);
        assert!(all.processes.iter().all(|p| p.window_title.is_some()));
    }

    #[test]
    fn test_command_writes_loadable_fixture() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("fixture.json");
        command_generate_testdata(path.clone(), 5, 0.5).expect("generate");

        let loaded = herakles_proc_scheduler::process::load_fixture_from_file(&path).expect("load");
        assert_eq!(loaded.processes.len(), 5);
    }
}
