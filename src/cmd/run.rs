//! Whole-cycle commands: `adw run` (guarded) and `adw cycle` (unguarded).

use anyhow::Result;
use tracing::warn;

use adw::config::AdwConfig;
use adw::models::CycleResult;
use adw::orchestrator::{Orchestrator, Outcome};
use adw::phases::Collaborators;
use adw::pipeline::Pipeline;
use adw::state::StateStore;

fn print_result(result: &CycleResult) {
    if result.success {
        let sha = result.commit_sha.as_deref().unwrap_or("-");
        println!(
            "{} Issue #{} completed (commit {}, {} test attempt{})",
            console::style("✅").green(),
            result.item,
            sha,
            result.test_attempts,
            if result.test_attempts == 1 { "" } else { "s" }
        );
    } else {
        eprintln!(
            "{} Issue #{} failed at {} phase: {}",
            console::style("❌").red(),
            result.item,
            result.phase_name(),
            result.error.as_deref().unwrap_or("Unknown error")
        );
    }
}

pub async fn cmd_run(config: AdwConfig, issue: u64) -> Result<bool> {
    let deps = Collaborators::connect(config)?;
    let outcome = Orchestrator::new(deps).process(issue).await;

    match &outcome {
        Outcome::Skipped { reason } => {
            println!(
                "{} Issue #{} skipped: {}",
                console::style("⏭").yellow(),
                issue,
                reason
            );
        }
        Outcome::Finished(result) => print_result(result),
        Outcome::Errored { error } => {
            eprintln!(
                "{} Issue #{} could not be processed: {}",
                console::style("❌").red(),
                issue,
                error
            );
        }
    }
    Ok(!outcome.is_failure())
}

pub async fn cmd_cycle(config: AdwConfig, issue: u64, save_state: bool) -> Result<bool> {
    let store = StateStore::new(config.state_dir());
    let deps = Collaborators::connect(config)?;
    let result = Pipeline::new(deps).run(issue).await;

    if save_state {
        match store.save(&result) {
            Ok(path) => println!("State saved to {}", path.display()),
            Err(e) => warn!(issue, error = %e, "Failed to save state"),
        }
    }
    print_result(&result);
    Ok(result.success)
}
