//! Label-based concurrency guard.
//!
//! The processing label is an advisory lock that lives in the tracker.
//! Eligibility and acquisition are separate tracker round-trips, so two
//! near-simultaneous events can both pass [`is_eligible`]. [`Guard::acquire`]
//! narrows that window with a read-after-write check but cannot close it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AdwConfig, LabelsConfig};
use crate::errors::GuardError;
use crate::models::{CycleResult, WorkItem};
use crate::tracker::Tracker;
use crate::util::preview;

/// Longest error text quoted inline in a failure comment. Longer errors go
/// into a collapsed, truncated block; the snapshot keeps the full text.
const COMMENT_ERROR_CHARS: usize = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub eligible: bool,
    pub reason: String,
}

impl Eligibility {
    fn yes() -> Self {
        Self {
            eligible: true,
            reason: "Issue is eligible for processing".to_string(),
        }
    }

    fn no(reason: &str) -> Self {
        Self {
            eligible: false,
            reason: reason.to_string(),
        }
    }
}

/// Fails closed: only open items without processing/completed markers and
/// with a non-trivial body are eligible.
pub fn is_eligible(item: &WorkItem, labels: &LabelsConfig, min_body_chars: usize) -> Eligibility {
    if !item.is_open() {
        return Eligibility::no("Issue is not open");
    }
    if item.has_label(&labels.processing) {
        return Eligibility::no("Issue is already being processed");
    }
    if item.has_label(&labels.completed) {
        return Eligibility::no("Issue was already completed");
    }
    if item.body.trim().chars().count() < min_body_chars {
        return Eligibility::no("Issue body is too short or empty");
    }
    Eligibility::yes()
}

fn announcement() -> &'static str {
    "🤖 **Agentic AI Workflow Started**\n\n\
     This issue is being processed autonomously. Planned phases:\n\n\
     1. **PLAN** - Generate a specification\n\
     2. **BUILD** - Implement the code\n\
     3. **TEST** - Run and fix tests\n\
     4. **COMMIT** - Commit, push and close\n\n\
     _Progress will be posted here._"
}

fn failure_comment(result: &CycleResult) -> String {
    let error = result.error.as_deref().unwrap_or("Unknown error");
    if error.chars().count() <= COMMENT_ERROR_CHARS {
        return format!(
            "❌ **Workflow failed at {} phase**\n\nError: {}\n\nPlease review and fix manually.",
            result.phase_name(),
            error
        );
    }
    format!(
        "❌ **Workflow failed at {} phase**\n\n\
         <details><summary>Error (truncated, full text in the state snapshot)</summary>\n\n\
         ```\n{}\n```\n</details>\n\n\
         Please review and fix manually.",
        result.phase_name(),
        preview(error, COMMENT_ERROR_CHARS)
    )
}

/// Applies and clears the marker labels for one item's cycle.
pub struct Guard {
    tracker: Arc<dyn Tracker>,
    config: Arc<AdwConfig>,
}

impl Guard {
    pub fn new(tracker: Arc<dyn Tracker>, config: Arc<AdwConfig>) -> Self {
        Self { tracker, config }
    }

    pub fn check(&self, item: &WorkItem) -> Eligibility {
        is_eligible(item, self.config.labels(), self.config.min_body_chars())
    }

    /// Add the processing label, re-read the item, and announce the cycle.
    ///
    /// Tracker failures are logged and do not block. Returns `Superseded`
    /// when the re-read shows the item was closed or completed meanwhile;
    /// the label just added is removed again in that case.
    pub async fn acquire(&self, number: u64) -> Result<(), GuardError> {
        let labels = self.config.labels();
        if let Err(e) = self.tracker.add_label(number, &labels.processing).await {
            warn!(issue = number, error = %e, "Failed to add processing label (non-critical)");
        }

        match self.tracker.get_item(number).await {
            Ok(item) => {
                let reason = if !item.is_open() {
                    Some("Issue was closed")
                } else if item.has_label(&labels.completed) {
                    Some("Issue was already completed")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    warn!(issue = number, reason, "Item changed while acquiring, skipping");
                    if let Err(e) = self.tracker.remove_label(number, &labels.processing).await {
                        warn!(issue = number, error = %e, "Failed to remove processing label");
                    }
                    return Err(GuardError::Superseded {
                        number,
                        reason: reason.to_string(),
                    });
                }
            }
            Err(e) => {
                warn!(issue = number, error = %e, "Could not re-read item after labeling, proceeding");
            }
        }

        if let Err(e) = self.tracker.add_comment(number, announcement()).await {
            warn!(issue = number, error = %e, "Failed to post announcement (non-critical)");
        }
        info!(issue = number, "Acquired");
        Ok(())
    }

    /// Clear the processing label and apply exactly one terminal label.
    /// Never fails.
    pub async fn release(&self, result: &CycleResult) {
        let number = result.item;
        let labels = self.config.labels();

        if let Err(e) = self.tracker.remove_label(number, &labels.processing).await {
            warn!(issue = number, error = %e, "Failed to remove processing label");
        }

        let terminal = if result.success {
            &labels.completed
        } else {
            &labels.needs_review
        };
        if let Err(e) = self.tracker.add_label(number, terminal).await {
            warn!(issue = number, label = %terminal, error = %e, "Failed to add final label");
        }

        if !result.success {
            let body = failure_comment(result);
            if let Err(e) = self.tracker.add_comment(number, &body).await {
                warn!(issue = number, error = %e, "Failed to post failure comment");
            }
        }
        info!(issue = number, label = %terminal, "Released");
    }
}
