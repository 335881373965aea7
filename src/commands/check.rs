//! Check command implementation.
//!
//! Validates /proc access, the optional window backend and configuration.

use herakles_proc_scheduler::config::{validate_effective_config, Config};
use herakles_proc_scheduler::process::{collect_proc_entries, ProcessHost, ProcfsHost};
use herakles_proc_scheduler::{ResourceProbe, WindowOwnership, WmctrlWindows};
use nix::unistd::geteuid;
use std::path::Path;

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Process Scheduler - System Check");
    println!("============================================");

    let mut all_ok = true;

    println!("\n📁 Checking /proc filesystem...");
    if Path::new("/proc").exists() {
        println!("   ✅ /proc filesystem accessible");

        match collect_proc_entries(Path::new("/proc")) {
            Ok(entries) if !entries.is_empty() => {
                println!("   ✅ Can read {} process entries", entries.len());
            }
            Ok(_) => {
                println!("   ❌ Cannot read any process entries from /proc");
                all_ok = false;
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }

        let host = ProcfsHost::default();
        let own = std::process::id();
        match host.details(own) {
            Ok(d) => println!(
                "   ✅ Process details readable (self: {}, {} KB RSS)",
                d.name,
                d.rss_bytes / 1024
            ),
            Err(e) => {
                println!("   ❌ Cannot read own process details: {}", e);
                all_ok = false;
            }
        }
    } else {
        println!("   ❌ /proc filesystem not found");
        all_ok = false;
    }

    if geteuid().is_root() {
        println!("   ✅ Running as root - all processes visible");
    } else {
        println!("   ⚠️  Not running as root - other users' processes may be partially readable");
    }

    println!("\n📈 Checking resource summary sources...");
    match ResourceProbe::default().sample() {
        Ok(summary) => println!(
            "   ✅ /proc/stat and /proc/meminfo readable ({} MB total memory)",
            summary.memory_total_bytes / 1024 / 1024
        ),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n🪟 Checking window ownership backend...");
    match WmctrlWindows.visible_window_pids() {
        Some(pids) => println!("   ✅ wmctrl reports {} windowed processes", pids.len()),
        None => println!("   ⚠️  No window backend - the visible-app filter will show every process"),
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
