//! Guarded cycle: eligibility, acquire, pipeline, snapshot, release.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::errors::GuardError;
use crate::guard::Guard;
use crate::models::CycleResult;
use crate::phases::Collaborators;
use crate::pipeline::Pipeline;
use crate::server::Dispatcher;
use crate::state::StateStore;

/// How a guarded cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not eligible, or superseded while acquiring
    Skipped { reason: String },
    /// The pipeline ran; the result says whether it succeeded
    Finished(CycleResult),
    /// The item could not be read; it was escalated for review
    Errored { error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Skipped { .. } => false,
            Self::Finished(result) => !result.success,
            Self::Errored { .. } => true,
        }
    }
}

pub struct Orchestrator {
    deps: Collaborators,
    guard: Guard,
    store: StateStore,
    pipeline: Arc<Pipeline>,
}

impl Orchestrator {
    pub fn new(deps: Collaborators) -> Self {
        let pipeline = Arc::new(Pipeline::new(deps.clone()));
        Self::with_pipeline(deps, pipeline)
    }

    pub fn with_pipeline(deps: Collaborators, pipeline: Arc<Pipeline>) -> Self {
        let guard = Guard::new(deps.tracker.clone(), deps.config.clone());
        let store = StateStore::new(deps.config.state_dir());
        Self {
            deps,
            guard,
            store,
            pipeline,
        }
    }

    /// Run one guarded cycle. Never fails and never leaves the processing
    /// label behind once it was acquired.
    pub async fn process(&self, number: u64) -> Outcome {
        info!(issue = number, "Processing issue");

        let item = match self.deps.tracker.get_item(number).await {
            Ok(item) => item,
            Err(e) => {
                error!(issue = number, error = %e, "Failed to fetch issue");
                self.escalate(number, &e.to_string()).await;
                return Outcome::Errored {
                    error: e.to_string(),
                };
            }
        };

        let eligibility = self.guard.check(&item);
        if !eligibility.eligible {
            info!(issue = number, reason = %eligibility.reason, "Skipping issue");
            return Outcome::Skipped {
                reason: eligibility.reason,
            };
        }

        if let Err(GuardError::Superseded { reason, .. }) = self.guard.acquire(number).await {
            return Outcome::Skipped { reason };
        }

        // Run in its own task so a panic still reaches release
        let pipeline = self.pipeline.clone();
        let result = match tokio::spawn(async move { pipeline.run(number).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(issue = number, error = %e, "Pipeline task died");
                CycleResult::aborted(number, None, format!("Pipeline task failed: {}", e))
            }
        };

        if let Err(e) = self.store.save(&result) {
            warn!(issue = number, error = %e, "Failed to save state");
        }
        self.guard.release(&result).await;

        if result.success {
            info!(issue = number, "Workflow completed successfully");
        } else {
            warn!(issue = number, phase = result.phase_name(), "Workflow failed");
        }
        Outcome::Finished(result)
    }

    /// Best-effort: mark the item for review and explain why.
    async fn escalate(&self, number: u64, error: &str) {
        let labels = self.deps.config.labels();
        if let Err(e) = self.deps.tracker.add_label(number, &labels.needs_review).await {
            warn!(issue = number, error = %e, "Failed to add needs-review label");
        }
        self.deps
            .advisory_comment(
                number,
                &format!(
                    "❌ **Orchestrator error**\n\nError: {}\n\nPlease review and fix manually.",
                    error
                ),
            )
            .await;
    }
}

/// Runs each dispatched issue in a background task and keeps track of the
/// ones still running, so shutdown can wait for them to release.
pub struct BackgroundDispatcher {
    orchestrator: Arc<Orchestrator>,
    tasks: TaskTracker,
}

impl BackgroundDispatcher {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tasks: TaskTracker::new(),
        }
    }

    /// Cycles dispatched and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every dispatched cycle to finish.
    pub async fn drain(&self) {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            info!(pending, "Waiting for in-flight cycles to finish");
        }
        self.tasks.wait().await;
    }
}

impl Dispatcher for BackgroundDispatcher {
    fn dispatch(&self, issue: u64) {
        let orchestrator = self.orchestrator.clone();
        self.tasks.spawn(async move {
            let outcome = orchestrator.process(issue).await;
            info!(issue, failed = outcome.is_failure(), "Background cycle finished");
        });
    }
}
