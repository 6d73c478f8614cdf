//! Issue tracker seam.
//!
//! The core only ever talks to the tracker through [`Tracker`]. The real
//! implementation is [`github::GitHubTracker`]; tests use an in-memory double.

pub mod github;

use async_trait::async_trait;

use crate::errors::TrackerError;
use crate::models::WorkItem;

pub use github::GitHubTracker;

/// Operations the pipeline needs from an issue tracker.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Fetch a fresh snapshot of an item.
    async fn get_item(&self, number: u64) -> Result<WorkItem, TrackerError>;

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    /// Remove a label. Removing a label that is not present succeeds.
    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), TrackerError>;

    /// Close an item, posting `comment` first when given.
    async fn close_item(&self, number: u64, comment: Option<&str>) -> Result<(), TrackerError>;

    /// Web link for a commit, when the tracker knows the repository.
    fn commit_url(&self, _sha: &str) -> Option<String> {
        None
    }
}
