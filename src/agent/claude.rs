use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::Agent;
use crate::errors::AgentError;
use crate::util::preview;

/// Runs the Claude CLI in print mode: `<cmd> -p <prompt>`.
pub struct ClaudeCli {
    command: String,
    workdir: PathBuf,
    timeout: Duration,
}

impl ClaudeCli {
    pub fn new(command: impl Into<String>, workdir: &Path, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            workdir: workdir.to_path_buf(),
            timeout,
        }
    }
}

#[async_trait]
impl Agent for ClaudeCli {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        info!(cmd = %self.command, prompt_chars = prompt.chars().count(), "Invoking agent");
        debug!(preview = %preview(prompt, 200), "Prompt");

        let child = Command::new(&self.command)
            .args(["-p", prompt])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(AgentError::Spawn)?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(AgentError::Spawn)?,
            Err(_) => {
                return Err(AgentError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(AgentError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!(chars = text.chars().count(), "Agent response received");
        Ok(text)
    }
}
