use async_trait::async_trait;
use tracing::{error, info};

use super::retry::RetryController;
use super::{Collaborators, CycleContext, PhaseStep};
use crate::errors::PhaseError;
use crate::models::{Phase, PhaseResult};
use crate::prompts::TEST_TEMPLATE;
use crate::util::preview;

/// Longest test output quoted back into a tracker comment.
const COMMENT_OUTPUT_CHARS: usize = 3000;

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Runs the test suite, feeding failures back to the agent until it passes
/// or the retry bound is reached.
pub struct TestPhase {
    deps: Collaborators,
}

impl TestPhase {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl PhaseStep for TestPhase {
    fn phase(&self) -> Phase {
        Phase::Test
    }

    async fn execute(&self, ctx: &mut CycleContext) -> Result<PhaseResult, PhaseError> {
        let number = ctx.item;
        let (spec_path, spec) = ctx.read_spec()?;
        let spec_path = spec_path.display().to_string();
        info!(issue = number, spec = %spec_path, "Testing");

        let prompts = &self.deps.prompts;
        let controller = RetryController::new(
            self.deps.verifier.as_ref(),
            self.deps.agent.as_ref(),
            self.deps.config.max_retries(),
        );
        let outcome = controller
            .run(|attempt, output| {
                prompts.render(
                    TEST_TEMPLATE,
                    &[
                        ("ISSUE_NUMBER", number.to_string()),
                        ("SPEC_PATH", spec_path.clone()),
                        ("SPEC_CONTENT", spec.clone()),
                        ("TEST_OUTPUT", output.to_string()),
                        ("ATTEMPT", attempt.to_string()),
                    ],
                )
            })
            .await?;
        ctx.test_attempts = outcome.attempts;

        if outcome.success {
            let n = outcome.attempts;
            self.deps
                .advisory_comment(
                    number,
                    &format!(
                        "✅ **Phase 3/4: TEST - Completed**\n\n\
                         **Agent Actions:**\n\
                         - ✓ Analyzed acceptance criteria\n\
                         - ✓ {}\n\
                         - ✓ Executed test suite\n\
                         - ✓ All tests passed ({} attempt{})\n\n\
                         **Next:** Phase 4/4 - COMMIT (commit and close issue)\n\n\
                         _Agent is continuing autonomously..._",
                        if n == 1 {
                            "Wrote tests for new code"
                        } else {
                            "Wrote tests and fixed issues"
                        },
                        n,
                        plural(n)
                    ),
                )
                .await;
            return Ok(PhaseResult::succeeded(Phase::Test, None));
        }

        let summary = format!("Tests failed after {} attempts", outcome.attempts);
        error!(issue = number, output = %preview(&outcome.output, 500), "{}", summary);
        self.deps
            .advisory_comment(
                number,
                &format!(
                    "❌ **TEST phase failed**\n\n{}.\n\n\
                     <details><summary>Last test output</summary>\n\n```\n{}\n```\n</details>\n\n\
                     Please review manually.",
                    summary,
                    preview(&outcome.output, COMMENT_OUTPUT_CHARS)
                ),
            )
            .await;
        Ok(PhaseResult::failed(Phase::Test, outcome.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdwToml;
    use crate::test_support::{Harness, MockTracker, ScriptedAgent, ScriptedVerifier, issue};
    use crate::verify::Verification;

    fn harness(verifier: ScriptedVerifier, max_retries: u32) -> Harness {
        let mut toml = AdwToml::default();
        toml.timeouts.max_retries = max_retries;
        Harness::with_toml(
            MockTracker::new().with_item(issue(9, "Add export", "Export to CSV please", &[])),
            ScriptedAgent::ok("fixed"),
            verifier,
            toml,
        )
    }

    #[tokio::test]
    async fn test_passes_after_two_failures() {
        let h = harness(
            ScriptedVerifier::with_tests(vec![
                Verification::failed("expected 3, got 2"),
                Verification::failed("expected 3, got 4"),
                Verification::passed("ok"),
            ]),
            3,
        );
        let spec = h.write_spec("issue-9-add-export.md", "# Export spec");
        let mut ctx = CycleContext::new(9).with_spec(spec);

        let result = TestPhase::new(h.deps.clone()).execute(&mut ctx).await.unwrap();

        assert!(result.success);
        assert_eq!(ctx.test_attempts, 3);
        let prompts = h.agent.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("expected 3, got 2"));
        assert!(prompts[0].contains("attempt 2"));
        assert!(prompts[1].contains("attempt 3"));
        assert!(prompts[0].contains("# Export spec"));
        let comments = h.tracker.comments(9);
        assert!(comments[0].contains("All tests passed (3 attempts)"));
        assert!(comments[0].contains("Wrote tests and fixed issues"));
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_failure() {
        let h = harness(
            ScriptedVerifier::with_tests(vec![Verification::failed("still red")]),
            3,
        );
        let spec = h.write_spec("issue-9-add-export.md", "spec");
        let mut ctx = CycleContext::new(9).with_spec(spec);

        let result = TestPhase::new(h.deps.clone()).execute(&mut ctx).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.diagnostic, "still red");
        assert_eq!(ctx.test_attempts, 4);
        assert_eq!(h.verifier.test_runs(), 4);
        let comments = h.tracker.comments(9);
        assert!(comments[0].starts_with("❌ **TEST phase failed**"));
        assert!(comments[0].contains("Tests failed after 4 attempts"));
        assert!(comments[0].contains("still red"));
    }

    #[tokio::test]
    async fn test_single_pass_comment_is_singular() {
        let h = harness(ScriptedVerifier::passing(), 3);
        let spec = h.write_spec("issue-9-add-export.md", "spec");
        let mut ctx = CycleContext::new(9).with_spec(spec);

        TestPhase::new(h.deps.clone()).execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.test_attempts, 1);
        assert!(h.tracker.comments(9)[0].contains("(1 attempt)"));
    }

    #[tokio::test]
    async fn test_missing_spec_is_fatal() {
        let h = harness(ScriptedVerifier::passing(), 3);
        let mut ctx = CycleContext::new(9);
        let err = TestPhase::new(h.deps.clone())
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PhaseError::SpecMissing { .. }));
        assert_eq!(h.verifier.test_runs(), 0);
    }
}
