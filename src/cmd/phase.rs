//! Per-phase commands: `adw plan|build|test|commit`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use adw::config::AdwConfig;
use adw::models::PhaseResult;
use adw::phases::{
    BuildPhase, Collaborators, CommitPhase, CycleContext, PhaseStep, PlanPhase, TestPhase,
};

/// Run one phase and print a one-line summary. Returns whether it succeeded.
async fn run_phase(step: &dyn PhaseStep, mut ctx: CycleContext) -> bool {
    let phase = step.phase();
    match step.execute(&mut ctx).await {
        Ok(PhaseResult {
            success: true,
            artifact,
            ..
        }) => {
            let detail = artifact.map(|a| format!(": {}", a)).unwrap_or_default();
            println!(
                "{} {} phase completed for issue #{}{}",
                console::style("✅").green(),
                phase,
                ctx.item,
                detail
            );
            true
        }
        Ok(PhaseResult { diagnostic, .. }) => {
            report_failure(phase, ctx.item, &diagnostic);
            false
        }
        Err(e) => {
            report_failure(phase, ctx.item, &e.to_string());
            false
        }
    }
}

fn report_failure(phase: impl std::fmt::Display, item: u64, message: &str) {
    eprintln!(
        "{} {} phase failed for issue #{}: {}",
        console::style("❌").red(),
        phase,
        item,
        message
    );
}

/// Spec paths on the command line are relative to the working directory,
/// not to `--project-dir`.
fn resolve_spec_path(cwd: &Path, spec_path: PathBuf) -> PathBuf {
    if spec_path.is_absolute() {
        spec_path
    } else {
        cwd.join(spec_path)
    }
}

fn spec_from_cli(spec_path: PathBuf) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(resolve_spec_path(&cwd, spec_path))
}

pub async fn cmd_plan(config: AdwConfig, issue: u64) -> Result<bool> {
    let deps = Collaborators::connect(config)?;
    Ok(run_phase(&PlanPhase::new(deps), CycleContext::new(issue)).await)
}

pub async fn cmd_build(config: AdwConfig, issue: u64, spec_path: PathBuf) -> Result<bool> {
    let spec_path = spec_from_cli(spec_path)?;
    let deps = Collaborators::connect(config)?;
    let ctx = CycleContext::new(issue).with_spec(spec_path);
    Ok(run_phase(&BuildPhase::new(deps), ctx).await)
}

pub async fn cmd_test(config: AdwConfig, issue: u64, spec_path: PathBuf) -> Result<bool> {
    let spec_path = spec_from_cli(spec_path)?;
    let deps = Collaborators::connect(config)?;
    let ctx = CycleContext::new(issue).with_spec(spec_path);
    Ok(run_phase(&TestPhase::new(deps), ctx).await)
}

pub async fn cmd_commit(config: AdwConfig, issue: u64, test_attempts: u32) -> Result<bool> {
    let deps = Collaborators::connect(config)?;
    let mut ctx = CycleContext::new(issue);
    ctx.test_attempts = test_attempts;
    Ok(run_phase(&CommitPhase::new(deps), ctx).await)
}
