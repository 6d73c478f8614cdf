use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use git2::{IndexAddOption, Repository, Signature};
use tokio::process::Command;
use tracing::{debug, info};

use super::{CommitOutcome, Vcs};
use crate::config::AdwConfig;
use crate::errors::VcsError;

/// git2-backed repository. Pushing goes through the `git` CLI so that the
/// user's credential helpers apply.
pub struct GitRepo {
    root: PathBuf,
    /// Repo-relative directories never staged by `add_all`
    excluded: Vec<PathBuf>,
}

impl GitRepo {
    pub fn open(root: &Path) -> Result<Self, VcsError> {
        Repository::open(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            excluded: Vec::new(),
        })
    }

    /// Open the project repository, keeping adw's log and state directories out of commits.
    pub fn from_config(config: &AdwConfig) -> Result<Self, VcsError> {
        let mut repo = Self::open(&config.project_dir)?;
        for dir in [config.logs_dir(), config.state_dir()] {
            if let Ok(rel) = dir.strip_prefix(&config.project_dir) {
                repo.excluded.push(rel.to_path_buf());
            }
        }
        Ok(repo)
    }

    pub fn with_excluded(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    fn repo(&self) -> Result<Repository, VcsError> {
        Ok(Repository::open(&self.root)?)
    }

    fn relative_to_workdir(repo: &Repository, path: &Path) -> Result<PathBuf, VcsError> {
        let outside = || VcsError::OutsideRepo {
            path: path.to_path_buf(),
        };
        let workdir = repo.workdir().ok_or_else(outside)?;
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        let workdir = workdir.canonicalize().map_err(|_| outside())?;
        let path = path.canonicalize().map_err(|_| outside())?;
        path.strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| outside())
    }

    fn signature(repo: &Repository) -> Result<Signature<'static>, VcsError> {
        match repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("adw", "adw@localhost")?),
        }
    }

    fn add_path_sync(&self, path: &Path) -> Result<(), VcsError> {
        let repo = self.repo()?;
        let rel = Self::relative_to_workdir(&repo, path)?;
        let mut index = repo.index()?;
        index.add_path(&rel)?;
        index.write()?;
        debug!(path = %rel.display(), "Staged file");
        Ok(())
    }

    fn add_all_sync(&self) -> Result<(), VcsError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let excluded = &self.excluded;
        let mut skip_excluded = |path: &Path, _matched: &[u8]| -> i32 {
            if excluded.iter().any(|dir| path.starts_with(dir)) {
                1
            } else {
                0
            }
        };
        index.add_all(
            ["*"].iter(),
            IndexAddOption::DEFAULT,
            Some(&mut skip_excluded as &mut git2::IndexMatchedPath),
        )?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        debug!("Staged all changes");
        Ok(())
    }

    fn commit_sync(&self, message: &str) -> Result<CommitOutcome, VcsError> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            info!("Nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let sig = Self::signature(&repo)?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        info!(sha = %oid, message, "Created commit");
        Ok(CommitOutcome::Created(oid.to_string()))
    }

    fn head_sha_sync(&self) -> Result<Option<String>, VcsError> {
        let repo = self.repo()?;
        Ok(repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
            .map(|c| c.id().to_string()))
    }
}

#[async_trait]
impl Vcs for GitRepo {
    async fn add_path(&self, path: &Path) -> Result<(), VcsError> {
        self.add_path_sync(path)
    }

    async fn add_all(&self) -> Result<(), VcsError> {
        self.add_all_sync()
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, VcsError> {
        self.commit_sync(message)
    }

    async fn head_sha(&self) -> Result<Option<String>, VcsError> {
        self.head_sha_sync()
    }

    async fn push(&self) -> Result<(), VcsError> {
        info!("Pushing to remote");
        let output = Command::new("git")
            .arg("push")
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(VcsError::Spawn)?;

        if !output.status.success() {
            return Err(VcsError::Push {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        info!("Pushed to remote");
        Ok(())
    }
}
