//! The four pipeline phases.
//!
//! Each phase is a [`PhaseStep`] holding a [`Collaborators`] bundle. Phases
//! share progress through a [`CycleContext`]: Plan fills in the spec path,
//! Test the attempt count, Commit the commit sha.

pub mod build;
pub mod commit;
pub mod plan;
pub mod retry;
pub mod test;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use crate::agent::{Agent, ClaudeCli, RetryingAgent};
use crate::config::AdwConfig;
use crate::errors::PhaseError;
use crate::models::{Phase, PhaseResult};
use crate::prompts::PromptRenderer;
use crate::tracker::{GitHubTracker, Tracker};
use crate::vcs::{GitRepo, Vcs};
use crate::verify::{CommandVerifier, Verifier};

pub use build::BuildPhase;
pub use commit::CommitPhase;
pub use plan::PlanPhase;
pub use test::TestPhase;

/// Everything a phase talks to, fixed at construction time.
#[derive(Clone)]
pub struct Collaborators {
    pub config: Arc<AdwConfig>,
    pub tracker: Arc<dyn Tracker>,
    pub agent: Arc<dyn Agent>,
    pub verifier: Arc<dyn Verifier>,
    pub vcs: Arc<dyn Vcs>,
    pub prompts: Arc<PromptRenderer>,
}

impl Collaborators {
    /// Wire up the production adapters for a project.
    pub fn connect(config: AdwConfig) -> Result<Self> {
        let tracker = GitHubTracker::from_config(&config).context("Failed to set up GitHub client")?;
        let vcs = GitRepo::from_config(&config).context("Failed to open git repository")?;
        let agent = RetryingAgent::new(
            ClaudeCli::new(
                config.toml.agent_cmd(),
                &config.project_dir,
                config.agent_timeout(),
            ),
            config.max_retries(),
        );
        let verifier = CommandVerifier::from_config(&config);
        let prompts = PromptRenderer::new(&config.commands_dir());

        Ok(Self {
            config: Arc::new(config),
            tracker: Arc::new(tracker),
            agent: Arc::new(agent),
            verifier: Arc::new(verifier),
            vcs: Arc::new(vcs),
            prompts: Arc::new(prompts),
        })
    }

    /// Post a comment, logging instead of failing.
    pub async fn advisory_comment(&self, number: u64, body: &str) {
        if let Err(e) = self.tracker.add_comment(number, body).await {
            warn!(issue = number, error = %e, "Failed to add comment (non-critical)");
        }
    }
}

/// Progress shared between phases of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    pub item: u64,
    pub spec_path: Option<PathBuf>,
    pub commit_sha: Option<String>,
    pub test_attempts: u32,
}

impl CycleContext {
    pub fn new(item: u64) -> Self {
        Self {
            item,
            ..Self::default()
        }
    }

    pub fn with_spec(mut self, spec_path: PathBuf) -> Self {
        self.spec_path = Some(spec_path);
        self
    }

    /// Read the spec written by Plan. A missing file is fatal.
    pub fn read_spec(&self) -> Result<(PathBuf, String), PhaseError> {
        let path = self
            .spec_path
            .clone()
            .ok_or_else(|| PhaseError::SpecMissing {
                path: PathBuf::from("(no spec produced)"),
            })?;
        if !path.is_file() {
            return Err(PhaseError::SpecMissing { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| PhaseError::Io {
            path: path.clone(),
            source,
        })?;
        Ok((path, content))
    }
}

/// One step of the pipeline.
#[async_trait]
pub trait PhaseStep: Send + Sync {
    fn phase(&self) -> Phase;

    /// `Err` is a fatal failure; `Ok` with `success == false` is a reported
    /// failure. Both stop the cycle.
    async fn execute(&self, ctx: &mut CycleContext) -> Result<PhaseResult, PhaseError>;
}
