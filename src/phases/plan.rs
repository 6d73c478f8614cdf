use async_trait::async_trait;
use tracing::{info, warn};

use super::{Collaborators, CycleContext, PhaseStep};
use crate::errors::PhaseError;
use crate::models::{Phase, PhaseResult};
use crate::prompts::PLAN_TEMPLATE;
use crate::util::{preview, slugify};
use crate::vcs::CommitOutcome;

/// Longest slug used in a spec filename.
pub const SLUG_MAX_LEN: usize = 50;

/// `issue-<n>-<slug>.md`
pub fn spec_filename(number: u64, title: &str) -> String {
    format!("issue-{}-{}.md", number, slugify(title, SLUG_MAX_LEN))
}

pub fn plan_commit_message(number: u64) -> String {
    format!("docs: Add spec for issue #{} (PLAN)", number)
}

/// Turns the issue into a committed specification document.
pub struct PlanPhase {
    deps: Collaborators,
}

impl PlanPhase {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl PhaseStep for PlanPhase {
    fn phase(&self) -> Phase {
        Phase::Plan
    }

    async fn execute(&self, ctx: &mut CycleContext) -> Result<PhaseResult, PhaseError> {
        let number = ctx.item;
        let item = self.deps.tracker.get_item(number).await?;
        info!(issue = number, title = %item.title, body = %preview(&item.body, 100), "Planning");

        let prompt = self.deps.prompts.render(
            PLAN_TEMPLATE,
            &[
                ("ISSUE_NUMBER", number.to_string()),
                ("ISSUE_TITLE", item.title.clone()),
                ("ISSUE_BODY", item.body.clone()),
            ],
        )?;
        let spec = self.deps.agent.generate(&prompt).await?;

        let specs_dir = self.deps.config.specs_dir();
        std::fs::create_dir_all(&specs_dir).map_err(|source| PhaseError::Io {
            path: specs_dir.clone(),
            source,
        })?;
        let filename = spec_filename(number, &item.title);
        let spec_path = specs_dir.join(&filename);
        std::fs::write(&spec_path, &spec).map_err(|source| PhaseError::Io {
            path: spec_path.clone(),
            source,
        })?;
        info!(issue = number, path = %spec_path.display(), "Wrote spec");

        self.deps.vcs.add_path(&spec_path).await?;
        match self.deps.vcs.commit(&plan_commit_message(number)).await? {
            CommitOutcome::Created(sha) => info!(issue = number, sha = %sha, "Committed spec"),
            CommitOutcome::NothingToCommit => {
                warn!(issue = number, "Spec unchanged, nothing to commit")
            }
        }
        ctx.spec_path = Some(spec_path.clone());

        self.deps
            .advisory_comment(
                number,
                &format!(
                    "✅ **Phase 1/4: PLAN - Completed**\n\n\
                     **Agent Actions:**\n\
                     - ✓ Analyzed issue requirements\n\
                     - ✓ Generated specification document\n\
                     - ✓ Committed spec: `{}`\n\n\
                     **Next:** Phase 2/4 - BUILD (implement code)\n\n\
                     _Agent is continuing autonomously..._",
                    filename
                ),
            )
            .await;

        Ok(PhaseResult::succeeded(
            Phase::Plan,
            Some(spec_path.display().to_string()),
        ))
    }
}
