use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LabelsConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Open,
    Closed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid item state: {}", s)),
        }
    }
}

/// Read snapshot of a tracker issue, fetched fresh for each use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub state: ItemState,
}

impl WorkItem {
    pub fn is_open(&self) -> bool {
        self.state == ItemState::Open
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Plan,
    Build,
    Test,
    Commit,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Plan, Phase::Build, Phase::Test, Phase::Commit];

    /// 1-based position in the pipeline.
    pub fn index(&self) -> usize {
        match self {
            Self::Plan => 1,
            Self::Build => 2,
            Self::Test => 3,
            Self::Commit => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "PLAN",
            Self::Build => "BUILD",
            Self::Test => "TEST",
            Self::Commit => "COMMIT",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plan" => Ok(Self::Plan),
            "build" => Ok(Self::Build),
            "test" => Ok(Self::Test),
            "commit" => Ok(Self::Commit),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

/// Outcome of one phase execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub phase: Phase,
    pub success: bool,
    /// Artifact reference: spec path for Plan, commit sha for Commit
    pub artifact: Option<String>,
    pub diagnostic: String,
}

impl PhaseResult {
    pub fn succeeded(phase: Phase, artifact: Option<String>) -> Self {
        Self {
            phase,
            success: true,
            artifact,
            diagnostic: String::new(),
        }
    }

    pub fn failed(phase: Phase, diagnostic: impl Into<String>) -> Self {
        Self {
            phase,
            success: false,
            artifact: None,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Result record of one cycle. Persisted as the per-item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleResult {
    pub item: u64,
    pub success: bool,
    /// Last phase attempted; the failing phase when `success` is false
    pub phase: Option<Phase>,
    pub error: Option<String>,
    pub spec_path: Option<String>,
    pub commit_sha: Option<String>,
    pub test_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CycleResult {
    pub fn start(item: u64) -> Self {
        Self {
            item,
            success: false,
            phase: None,
            error: None,
            spec_path: None,
            commit_sha: None,
            test_attempts: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Result for a cycle that died outside any phase.
    pub fn aborted(item: u64, phase: Option<Phase>, error: impl Into<String>) -> Self {
        let mut result = Self::start(item);
        result.phase = phase;
        result.error = Some(error.into());
        result.finished_at = Some(Utc::now());
        result
    }

    pub fn phase_name(&self) -> &'static str {
        self.phase.map(|p| p.as_str()).unwrap_or("UNKNOWN")
    }
}

/// Marker state of an item, from the core's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState {
    None,
    Processing,
    Completed,
    NeedsReview,
}

impl LabelState {
    /// Derive the marker state from a label set. Processing wins over
    /// terminal markers, completed over needs-review.
    pub fn from_labels(labels: &[String], names: &LabelsConfig) -> Self {
        let has = |name: &str| labels.iter().any(|l| l == name);
        if has(&names.processing) {
            Self::Processing
        } else if has(&names.completed) {
            Self::Completed
        } else if has(&names.needs_review) {
            Self::NeedsReview
        } else {
            Self::None
        }
    }
}
