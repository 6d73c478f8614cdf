//! Version control seam used by the Plan and Commit phases.

pub mod git;

use std::path::Path;

use async_trait::async_trait;

use crate::errors::VcsError;

pub use git::GitRepo;

/// Result of a commit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Created(String),
    /// The index matched HEAD; no commit was made
    NothingToCommit,
}

#[async_trait]
pub trait Vcs: Send + Sync {
    /// Stage a single file.
    async fn add_path(&self, path: &Path) -> Result<(), VcsError>;

    /// Stage every pending change, including deletions.
    async fn add_all(&self) -> Result<(), VcsError>;

    async fn commit(&self, message: &str) -> Result<CommitOutcome, VcsError>;

    /// Current HEAD commit, `None` on an unborn branch.
    async fn head_sha(&self) -> Result<Option<String>, VcsError>;

    async fn push(&self) -> Result<(), VcsError>;
}
