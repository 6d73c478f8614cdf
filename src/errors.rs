//! Typed error hierarchy for adw.
//!
//! One enum per collaborator seam plus the phase-level error the pipeline
//! engine classifies:
//! - `TrackerError`: issue tracker calls
//! - `AgentError`: code-generation agent invocation
//! - `VcsError`: staging, committing and pushing
//! - `PhaseError`: fatal failure of a single phase
//! - `GuardError`: label acquisition

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the issue tracker client.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracker returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Issue #{number} not found")]
    NotFound { number: u64 },

    #[error("No GitHub token configured (set GITHUB_TOKEN or GH_TOKEN)")]
    MissingToken,

    #[error("No GitHub repository configured and none could be detected from the origin remote")]
    MissingRepo,

    #[error("Tracker error: {0}")]
    Other(String),
}

/// Errors from the code-generation agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Failed to spawn agent process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Agent timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Agent exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("All {attempts} agent attempts failed. Last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

/// Errors from version control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to push: {stderr}")]
    Push { stderr: String },

    #[error("Repository has no commits")]
    NoHead,

    #[error("Path {} is outside the repository", path.display())]
    OutsideRepo { path: PathBuf },
}

/// Fatal failure of a single phase. Any of these stops the cycle.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error("Prompt template error: {0}")]
    Prompt(String),

    #[error("Spec file not found: {}", path.display())]
    SpecMissing { path: PathBuf },

    #[error("Static check failed:\n{output}")]
    CheckFailed { output: String },

    #[error("{message}")]
    CheckTimedOut { message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from acquiring the processing marker.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("Issue #{number} changed while acquiring: {reason}")]
    Superseded { number: u64, reason: String },
}
