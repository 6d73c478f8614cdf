use async_trait::async_trait;
use tracing::{info, warn};

use super::{Collaborators, CycleContext, PhaseStep};
use crate::errors::{PhaseError, VcsError};
use crate::models::{Phase, PhaseResult};
use crate::vcs::CommitOutcome;

/// Label aliases per conventional-commit type, in precedence order.
const LABEL_TYPES: &[(&[&str], &str)] = &[
    (&["bug", "fix"], "fix"),
    (&["documentation", "docs"], "docs"),
    (&["test", "testing"], "test"),
    (&["refactor", "refactoring"], "refactor"),
    (&["chore"], "chore"),
];

/// Title keywords per type, consulted only when no label matched.
const TITLE_TYPES: &[(&[&str], &str)] = &[
    (&["fix", "bug", "error", "issue"], "fix"),
    (&["doc", "readme"], "docs"),
    (&["test"], "test"),
    (&["refactor", "clean"], "refactor"),
];

/// Conventional-commit type from labels first, then title keywords.
pub fn commit_type(labels: &[String], title: &str) -> &'static str {
    let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    for (aliases, kind) in LABEL_TYPES {
        if labels.iter().any(|l| aliases.contains(&l.as_str())) {
            return *kind;
        }
    }

    let title = title.to_lowercase();
    for (words, kind) in TITLE_TYPES {
        if words.iter().any(|w| title.contains(w)) {
            return *kind;
        }
    }
    "feat"
}

/// `<type>: <title> (Issue #<n>)`
pub fn commit_message(number: u64, title: &str, labels: &[String]) -> String {
    format!("{}: {} (Issue #{})", commit_type(labels, title), title, number)
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn closing_comment(message: &str, sha: &str, url: Option<&str>, test_attempts: u32) -> String {
    let commit_ref = match url {
        Some(url) => format!("[{}]({})", short_sha(sha), url),
        None => format!("`{}`", short_sha(sha)),
    };
    let attempts = test_attempts.max(1);
    format!(
        "✅ **Phase 4/4: COMMIT - Completed**\n\n\
         🎉 **Issue Resolved Autonomously by AI Agent**\n\n\
         **Final Actions:**\n\
         - ✓ Staged all changes\n\
         - ✓ Created conventional commit: `{message}`\n\
         - ✓ Pushed to remote: {commit_ref}\n\
         - ✓ Closing issue automatically\n\n\
         ---\n\n\
         **Complete Workflow Summary:**\n\n\
         1. ✅ **PLAN** - Specification generated and committed\n\
         2. ✅ **BUILD** - Code implemented and type-checked\n\
         3. ✅ **TEST** - Tests written and passed ({attempts} attempt{s})\n\
         4. ✅ **COMMIT** - Changes committed and pushed\n\n\
         **Commit:** {commit_ref}\n\n\
         ---\n\n\
         _This issue was processed end-to-end by an autonomous AI agent without human intervention._\n",
        s = if attempts == 1 { "" } else { "s" },
    )
}

/// Commits everything, pushes, and closes the issue.
pub struct CommitPhase {
    deps: Collaborators,
}

impl CommitPhase {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl PhaseStep for CommitPhase {
    fn phase(&self) -> Phase {
        Phase::Commit
    }

    async fn execute(&self, ctx: &mut CycleContext) -> Result<PhaseResult, PhaseError> {
        let number = ctx.item;
        let item = self.deps.tracker.get_item(number).await?;
        let message = commit_message(number, &item.title, &item.labels);
        info!(issue = number, message = %message, "Committing");

        self.deps.vcs.add_all().await?;
        if self.deps.vcs.commit(&message).await? == CommitOutcome::NothingToCommit {
            warn!(issue = number, "Nothing to commit (changes were already committed)");
        }
        let sha = self.deps.vcs.head_sha().await?.ok_or(VcsError::NoHead)?;
        self.deps.vcs.push().await?;

        let url = self.deps.tracker.commit_url(&sha);
        let comment = closing_comment(&message, &sha, url.as_deref(), ctx.test_attempts);
        self.deps.tracker.close_item(number, Some(&comment)).await?;
        info!(issue = number, sha = %sha, "Issue closed");

        ctx.commit_sha = Some(sha.clone());
        Ok(PhaseResult::succeeded(Phase::Commit, Some(sha)))
    }
}
