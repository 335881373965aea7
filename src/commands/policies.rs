//! Policies command implementation.
//!
//! Lists the available scheduling policies.

use herakles_proc_scheduler::SchedulingPolicy;

/// Lists scheduling policies, marking the active one.
pub fn command_policies(
    verbose: bool,
    active: SchedulingPolicy,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("📊 Scheduling Policies");
    println!("======================\n");

    for policy in SchedulingPolicy::ALL {
        let marker = if policy == active { "*" } else { " " };
        println!("{} {:<18} {}", marker, policy.key(), policy.name());
        if verbose {
            println!("    {}", policy.description());
        }
    }

    println!("\n* = active policy");
    Ok(())
}
