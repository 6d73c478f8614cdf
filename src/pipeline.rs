//! Pipeline engine: Plan, Build, Test, Commit, halting at the first failure.

use chrono::Utc;
use tracing::{error, info};

use crate::models::CycleResult;
use crate::phases::{
    BuildPhase, Collaborators, CommitPhase, CycleContext, PhaseStep, PlanPhase, TestPhase,
};

pub struct Pipeline {
    steps: Vec<Box<dyn PhaseStep>>,
}

impl Pipeline {
    /// The standard four-phase pipeline.
    pub fn new(deps: Collaborators) -> Self {
        Self::from_steps(vec![
            Box::new(PlanPhase::new(deps.clone())),
            Box::new(BuildPhase::new(deps.clone())),
            Box::new(TestPhase::new(deps.clone())),
            Box::new(CommitPhase::new(deps)),
        ])
    }

    pub fn from_steps(steps: Vec<Box<dyn PhaseStep>>) -> Self {
        Self { steps }
    }

    /// Run one cycle for `item`. Never fails; failures are recorded in the result.
    pub async fn run(&self, item: u64) -> CycleResult {
        let mut result = CycleResult::start(item);
        let mut ctx = CycleContext::new(item);
        info!(issue = item, "Starting cycle");

        for step in &self.steps {
            let phase = step.phase();
            result.phase = Some(phase);
            info!(issue = item, phase = %phase, "[{}/{}] {}", phase.index(), self.steps.len(), phase);

            let outcome = step.execute(&mut ctx).await;
            result.spec_path = ctx.spec_path.as_ref().map(|p| p.display().to_string());
            result.commit_sha = ctx.commit_sha.clone();
            result.test_attempts = ctx.test_attempts;

            let failure = match outcome {
                Ok(r) if r.success => None,
                Ok(r) => Some(r.diagnostic),
                Err(e) => Some(e.to_string()),
            };
            if let Some(message) = failure {
                error!(issue = item, phase = %phase, error = %message, "Phase failed");
                result.error = Some(message);
                result.finished_at = Some(Utc::now());
                return result;
            }
            info!(issue = item, phase = %phase, "Phase complete");
        }

        result.success = true;
        result.finished_at = Some(Utc::now());
        info!(issue = item, sha = ?result.commit_sha, "Cycle complete");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdwToml;
    use crate::errors::PhaseError;
    use crate::models::{Phase, PhaseResult};
    use crate::test_support::{Harness, MockTracker, ScriptedAgent, ScriptedVerifier, issue};
    use crate::verify::Verification;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Step that records that it ran and returns a fixed outcome.
    struct Probe {
        phase: Phase,
        fail: Option<&'static str>,
        log: Arc<Mutex<Vec<Phase>>>,
    }

    #[async_trait]
    impl PhaseStep for Probe {
        fn phase(&self) -> Phase {
            self.phase
        }

        async fn execute(&self, _ctx: &mut CycleContext) -> Result<PhaseResult, PhaseError> {
            self.log.lock().unwrap().push(self.phase);
            match self.fail {
                Some(msg) => Err(PhaseError::Prompt(msg.to_string())),
                None => Ok(PhaseResult::succeeded(self.phase, None)),
            }
        }
    }

    fn probes(fail_at: Option<Phase>) -> (Pipeline, Arc<Mutex<Vec<Phase>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = Phase::ALL
            .iter()
            .map(|&phase| {
                Box::new(Probe {
                    phase,
                    fail: (Some(phase) == fail_at).then_some("boom"),
                    log: log.clone(),
                }) as Box<dyn PhaseStep>
            })
            .collect();
        (Pipeline::from_steps(steps), log)
    }

    #[tokio::test]
    async fn test_runs_all_phases_in_order() {
        let (pipeline, log) = probes(None);
        let result = pipeline.run(1).await;
        assert!(result.success);
        assert_eq!(result.phase, Some(Phase::Commit));
        assert_eq!(*log.lock().unwrap(), Phase::ALL.to_vec());
        assert!(result.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_halts_at_first_failure() {
        for failing in Phase::ALL {
            let (pipeline, log) = probes(Some(failing));
            let result = pipeline.run(1).await;

            assert!(!result.success);
            assert_eq!(result.phase, Some(failing));
            assert_eq!(result.error.as_deref(), Some("Prompt template error: boom"));
            let ran = log.lock().unwrap().clone();
            assert_eq!(ran.last(), Some(&failing));
            assert_eq!(ran.len(), failing.index());
        }
    }

    fn full_harness(verifier: ScriptedVerifier, max_retries: u32) -> Harness {
        let mut toml = AdwToml::default();
        toml.timeouts.max_retries = max_retries;
        Harness::with_toml(
            MockTracker::new().with_item(issue(
                42,
                "Fix login bug",
                "Login fails when the password has a space.",
                &["bug"],
            )),
            ScriptedAgent::ok("# Spec\nFix it."),
            verifier,
            toml,
        )
    }

    #[tokio::test]
    async fn test_full_cycle_with_mock_collaborators() {
        let h = full_harness(
            ScriptedVerifier::with_tests(vec![
                Verification::failed("1 failing"),
                Verification::failed("1 failing"),
                Verification::passed("ok"),
            ]),
            3,
        );

        let result = Pipeline::new(h.deps.clone()).run(42).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.test_attempts, 3);
        assert!(result.spec_path.as_deref().unwrap().ends_with("issue-42-fix-login-bug.md"));
        assert_eq!(
            h.vcs.commits(),
            vec![
                "docs: Add spec for issue #42 (PLAN)",
                "fix: Fix login bug (Issue #42)"
            ]
        );
        assert_eq!(result.commit_sha.as_deref(), Some(format!("{:040x}", 2).as_str()));
        assert!(!h.tracker.item(42).is_open());
    }

    #[tokio::test]
    async fn test_exhausted_tests_stop_before_commit() {
        let h = full_harness(
            ScriptedVerifier::with_tests(vec![Verification::failed("red")]),
            3,
        );

        let result = Pipeline::new(h.deps.clone()).run(42).await;

        assert!(!result.success);
        assert_eq!(result.phase, Some(Phase::Test));
        assert_eq!(result.test_attempts, 4);
        assert_eq!(result.error.as_deref(), Some("red"));
        assert!(result.commit_sha.is_none());
        assert_eq!(h.vcs.pushes(), 0);
        assert!(h.tracker.item(42).is_open());
    }

    #[tokio::test]
    async fn test_build_check_failure_skips_test_and_commit() {
        let h = full_harness(
            ScriptedVerifier::passing().with_check(Verification::failed("type error")),
            3,
        );

        let result = Pipeline::new(h.deps.clone()).run(42).await;

        assert!(!result.success);
        assert_eq!(result.phase, Some(Phase::Build));
        assert!(result.error.unwrap().contains("type error"));
        assert!(result.spec_path.is_some());
        assert_eq!(h.verifier.test_runs(), 0);
        assert_eq!(h.vcs.commits().len(), 1);
    }

    #[tokio::test]
    async fn test_each_phase_fetches_fresh_item() {
        let h = full_harness(ScriptedVerifier::passing(), 3);
        Pipeline::new(h.deps.clone()).run(42).await;
        let gets = h
            .tracker
            .calls()
            .iter()
            .filter(|c| c.as_str() == "get 42")
            .count();
        // Plan and Commit both read the item
        assert_eq!(gets, 2);
    }
}
