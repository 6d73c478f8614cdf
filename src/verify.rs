//! Verifier seam: a static check and a test suite run against the workspace.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::AdwConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Passed,
    Failed,
    /// The tool is not installed or not configured
    Skipped,
    TimedOut,
}

/// Outcome of one verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub status: VerifyStatus,
    /// Combined stdout and stderr, or a note on why the run did not happen
    pub output: String,
}

impl Verification {
    pub fn passed(output: impl Into<String>) -> Self {
        Self {
            status: VerifyStatus::Passed,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            status: VerifyStatus::Failed,
            output: output.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: VerifyStatus::Skipped,
            output: reason.into(),
        }
    }

    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            status: VerifyStatus::TimedOut,
            output: output.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == VerifyStatus::Passed
    }
}

#[async_trait]
pub trait Verifier: Send + Sync {
    /// Type/consistency check. `Skipped` when the tool is unavailable.
    async fn check(&self) -> Verification;

    /// Test suite. Never `Skipped`: a suite that cannot run has failed.
    async fn test(&self) -> Verification;
}

/// Runs configured argv commands in the project root.
pub struct CommandVerifier {
    workdir: PathBuf,
    check_command: Vec<String>,
    test_command: Vec<String>,
    check_timeout: Duration,
    test_timeout: Duration,
}

enum RunError {
    NotFound(String),
    Io(std::io::Error),
    TimedOut,
}

struct RunOutput {
    success: bool,
    combined: String,
}

impl CommandVerifier {
    pub fn new(
        workdir: &Path,
        check_command: Vec<String>,
        test_command: Vec<String>,
        check_timeout: Duration,
        test_timeout: Duration,
    ) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            check_command,
            test_command,
            check_timeout,
            test_timeout,
        }
    }

    pub fn from_config(config: &AdwConfig) -> Self {
        Self::new(
            &config.project_dir,
            config.toml.verify.check_command.clone(),
            config.toml.verify.test_command.clone(),
            config.check_timeout(),
            config.test_timeout(),
        )
    }

    async fn run(&self, argv: &[String], limit: Duration) -> Result<RunOutput, RunError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(RunError::NotFound("(empty command)".to_string()));
        };

        let child = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RunError::NotFound(program.clone()),
                _ => RunError::Io(e),
            })?;

        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result.map_err(RunError::Io)?,
            Err(_) => return Err(RunError::TimedOut),
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        Ok(RunOutput {
            success: output.status.success(),
            combined,
        })
    }
}

#[async_trait]
impl Verifier for CommandVerifier {
    async fn check(&self) -> Verification {
        if self.check_command.is_empty() {
            info!("No check command configured, skipping static check");
            return Verification::skipped("No check command configured");
        }
        info!(cmd = %self.check_command.join(" "), "Running static check");

        match self.run(&self.check_command, self.check_timeout).await {
            Ok(out) if out.success => Verification::passed(out.combined),
            Ok(out) => Verification::failed(out.combined),
            Err(RunError::NotFound(program)) => {
                warn!(program = %program, "Check tool not found, skipping static check");
                Verification::skipped(format!("{} not found", program))
            }
            Err(RunError::TimedOut) => Verification::timed_out(format!(
                "Static check timed out after {}s",
                self.check_timeout.as_secs()
            )),
            Err(RunError::Io(e)) => Verification::failed(format!("Failed to run check: {}", e)),
        }
    }

    async fn test(&self) -> Verification {
        if self.test_command.is_empty() {
            return Verification::failed("No test command configured");
        }
        info!(cmd = %self.test_command.join(" "), "Running tests");

        match self.run(&self.test_command, self.test_timeout).await {
            Ok(out) if out.success => Verification::passed(out.combined),
            Ok(out) => Verification::failed(out.combined),
            Err(RunError::NotFound(program)) => {
                Verification::failed(format!("{} not found", program))
            }
            Err(RunError::TimedOut) => Verification::timed_out(format!(
                "Tests timed out after {}s",
                self.test_timeout.as_secs()
            )),
            Err(RunError::Io(e)) => Verification::failed(format!("Failed to run tests: {}", e)),
        }
    }
}
