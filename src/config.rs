//! Configuration for adw, read from `.adw/config.toml`.
//!
//! Every section is optional; a missing file yields the defaults below.
//!
//! ```toml
//! [labels]
//! processing = "agent-processing"
//! completed = "agent-completed"
//! needs_review = "needs-review"
//!
//! [paths]
//! specs = "specs"
//! commands = ".claude/commands"
//! logs = ".adw/logs"
//! state = ".adw/state"
//!
//! [timeouts]
//! claude_timeout_seconds = 600
//! max_retries = 3
//! tracker_timeout_seconds = 30
//! check_timeout_seconds = 120
//! test_timeout_seconds = 300
//!
//! [eligibility]
//! min_body_chars = 10
//!
//! [github]
//! repo = "owner/repo"
//!
//! [verify]
//! check_command = ["npm", "run", "type-check"]
//! test_command = ["npm", "test", "--", "--passWithNoTests"]
//!
//! [agent]
//! command = "claude"
//! ```
//!
//! Paths are resolved relative to the project root.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under the project root holding adw's own files.
pub const ADW_DIR: &str = ".adw";
/// Config file name inside [`ADW_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Tracker label names used as markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default = "default_processing_label")]
    pub processing: String,
    #[serde(default = "default_completed_label")]
    pub completed: String,
    #[serde(default = "default_needs_review_label")]
    pub needs_review: String,
}

fn default_processing_label() -> String {
    "agent-processing".to_string()
}

fn default_completed_label() -> String {
    "agent-completed".to_string()
}

fn default_needs_review_label() -> String {
    "needs-review".to_string()
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            processing: default_processing_label(),
            completed: default_completed_label(),
            needs_review: default_needs_review_label(),
        }
    }
}

/// Directories, relative to the project root unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_specs_dir")]
    pub specs: PathBuf,
    #[serde(default = "default_commands_dir")]
    pub commands: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs: PathBuf,
    #[serde(default = "default_state_dir")]
    pub state: PathBuf,
}

fn default_specs_dir() -> PathBuf {
    PathBuf::from("specs")
}

fn default_commands_dir() -> PathBuf {
    PathBuf::from(".claude/commands")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from(".adw/logs")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".adw/state")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            specs: default_specs_dir(),
            commands: default_commands_dir(),
            logs: default_logs_dir(),
            state: default_state_dir(),
        }
    }
}

/// Timeouts and retry bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Per-invocation timeout for the agent CLI
    #[serde(default = "default_claude_timeout")]
    pub claude_timeout_seconds: u64,
    /// Agent attempts per invocation, and extra verifier attempts in the test phase
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_tracker_timeout")]
    pub tracker_timeout_seconds: u64,
    #[serde(default = "default_check_timeout")]
    pub check_timeout_seconds: u64,
    #[serde(default = "default_test_timeout")]
    pub test_timeout_seconds: u64,
}

fn default_claude_timeout() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_tracker_timeout() -> u64 {
    30
}

fn default_check_timeout() -> u64 {
    120
}

fn default_test_timeout() -> u64 {
    300
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            claude_timeout_seconds: default_claude_timeout(),
            max_retries: default_max_retries(),
            tracker_timeout_seconds: default_tracker_timeout(),
            check_timeout_seconds: default_check_timeout(),
            test_timeout_seconds: default_test_timeout(),
        }
    }
}

/// Eligibility rules applied before a cycle starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// Minimum trimmed body length, in characters
    #[serde(default = "default_min_body_chars")]
    pub min_body_chars: usize,
}

fn default_min_body_chars() -> usize {
    10
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            min_body_chars: default_min_body_chars(),
        }
    }
}

/// GitHub connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// `owner/repo`; detected from the `origin` remote when unset
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            api_url: default_api_url(),
        }
    }
}

/// Commands run by the verifier, as argv vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_check_command")]
    pub check_command: Vec<String>,
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
}

fn default_check_command() -> Vec<String> {
    ["npm", "run", "type-check"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_test_command() -> Vec<String> {
    ["npm", "test", "--", "--passWithNoTests"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            check_command: default_check_command(),
            test_command: default_test_command(),
        }
    }
}

/// Agent CLI settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent binary (default: "claude")
    #[serde(default)]
    pub command: Option<String>,
}

/// The complete config.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdwToml {
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub eligibility: EligibilityConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AdwToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load `config.toml` from `adw_dir`, or defaults if it does not exist.
    pub fn load_or_default(adw_dir: &Path) -> Result<Self> {
        let config_path = adw_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config.toml")
    }

    /// Agent command, with fallback to the `CLAUDE_CMD` environment variable.
    pub fn agent_cmd(&self) -> String {
        self.agent
            .command
            .clone()
            .or_else(|| std::env::var("CLAUDE_CMD").ok())
            .unwrap_or_else(|| "claude".to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let labels = [
            ("processing", &self.labels.processing),
            ("completed", &self.labels.completed),
            ("needs_review", &self.labels.needs_review),
        ];
        for (key, value) in &labels {
            if value.trim().is_empty() {
                warnings.push(format!("labels.{} is empty", key));
            }
        }
        for (i, (key_a, a)) in labels.iter().enumerate() {
            for (key_b, b) in &labels[i + 1..] {
                if a == b {
                    warnings.push(format!(
                        "labels.{} and labels.{} share the name '{}'",
                        key_a, key_b, a
                    ));
                }
            }
        }

        if self.timeouts.max_retries == 0 {
            warnings.push(
                "timeouts.max_retries is 0: the agent gets a single attempt and tests are never retried"
                    .to_string(),
            );
        }
        if self.timeouts.claude_timeout_seconds == 0 {
            warnings.push("timeouts.claude_timeout_seconds is 0".to_string());
        }
        if self.verify.check_command.is_empty() {
            warnings.push("verify.check_command is empty: the build check is skipped".to_string());
        }
        if self.verify.test_command.is_empty() {
            warnings.push("verify.test_command is empty: every test run fails".to_string());
        }
        if let Some(ref repo) = self.github.repo
            && repo.split('/').filter(|p| !p.is_empty()).count() != 2
        {
            warnings.push(format!("github.repo '{}' is not in owner/repo form", repo));
        }

        warnings
    }
}

/// Resolved configuration threaded through the pipeline at construction time.
#[derive(Debug, Clone)]
pub struct AdwConfig {
    /// Canonical project root
    pub project_dir: PathBuf,
    /// `<project>/.adw`
    pub adw_dir: PathBuf,
    /// Parsed config.toml
    pub toml: AdwToml,
}

impl AdwConfig {
    /// Load configuration for a project directory.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let adw_dir = project_dir.join(ADW_DIR);
        let toml = AdwToml::load_or_default(&adw_dir)?;
        Ok(Self {
            project_dir,
            adw_dir,
            toml,
        })
    }

    /// Build a config from an already-parsed file, without touching disk.
    pub fn from_parts(project_dir: PathBuf, toml: AdwToml) -> Self {
        let adw_dir = project_dir.join(ADW_DIR);
        Self {
            project_dir,
            adw_dir,
            toml,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    pub fn labels(&self) -> &LabelsConfig {
        &self.toml.labels
    }

    pub fn specs_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.specs)
    }

    pub fn commands_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.commands)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.logs)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.toml.paths.state)
    }

    /// Extra verifier attempts after the first test run.
    pub fn max_retries(&self) -> u32 {
        self.toml.timeouts.max_retries
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.timeouts.claude_timeout_seconds)
    }

    pub fn tracker_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.timeouts.tracker_timeout_seconds)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.timeouts.check_timeout_seconds)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.timeouts.test_timeout_seconds)
    }

    pub fn min_body_chars(&self) -> usize {
        self.toml.eligibility.min_body_chars
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
