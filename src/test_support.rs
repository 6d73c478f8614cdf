//! Test-only collaborator doubles.
//!
//! Each double records what the pipeline asked of it so tests can assert
//! on call order and on what was never called.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agent::Agent;
use crate::config::{AdwConfig, AdwToml};
use crate::errors::{AgentError, TrackerError, VcsError};
use crate::models::{ItemState, WorkItem};
use crate::phases::Collaborators;
use crate::prompts::PromptRenderer;
use crate::tracker::Tracker;
use crate::vcs::{CommitOutcome, Vcs};
use crate::verify::{Verification, Verifier};

/// Create an open issue with the given labels.
pub fn issue(number: u64, title: &str, body: &str, labels: &[&str]) -> WorkItem {
    WorkItem {
        number,
        title: title.to_string(),
        body: body.to_string(),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        state: ItemState::Open,
    }
}

// ── Tracker ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTracker {
    items: Mutex<HashMap<u64, WorkItem>>,
    comments: Mutex<Vec<(u64, String)>>,
    calls: Mutex<Vec<String>>,
    pub fail_get: AtomicBool,
    pub fail_labels: AtomicBool,
    pub fail_comments: AtomicBool,
    pub fail_close: AtomicBool,
    /// Close the item as soon as any label is added (simulates a concurrent close)
    pub close_when_labeled: AtomicBool,
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(self, item: WorkItem) -> Self {
        self.insert(item);
        self
    }

    pub fn insert(&self, item: WorkItem) {
        self.items.lock().unwrap().insert(item.number, item);
    }

    pub fn item(&self, number: u64) -> WorkItem {
        self.items.lock().unwrap()[&number].clone()
    }

    pub fn labels(&self, number: u64) -> Vec<String> {
        self.item(number).labels
    }

    pub fn comments(&self, number: u64) -> Vec<String> {
        self.comments
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == number)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn failing(flag: &AtomicBool, what: &str) -> Result<(), TrackerError> {
        if flag.load(Ordering::SeqCst) {
            Err(TrackerError::Other(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Tracker for MockTracker {
    async fn get_item(&self, number: u64) -> Result<WorkItem, TrackerError> {
        self.record(format!("get {}", number));
        Self::failing(&self.fail_get, "get")?;
        self.items
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or(TrackerError::NotFound { number })
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        self.record(format!("add_label {} {}", number, label));
        Self::failing(&self.fail_labels, "labels")?;
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(&number)
            .ok_or(TrackerError::NotFound { number })?;
        if !item.has_label(label) {
            item.labels.push(label.to_string());
        }
        if self.close_when_labeled.load(Ordering::SeqCst) {
            item.state = ItemState::Closed;
        }
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), TrackerError> {
        self.record(format!("remove_label {} {}", number, label));
        Self::failing(&self.fail_labels, "labels")?;
        if let Some(item) = self.items.lock().unwrap().get_mut(&number) {
            item.labels.retain(|l| l != label);
        }
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        self.record(format!("comment {}", number));
        Self::failing(&self.fail_comments, "comments")?;
        self.comments
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }

    async fn close_item(&self, number: u64, comment: Option<&str>) -> Result<(), TrackerError> {
        self.record(format!("close {}", number));
        Self::failing(&self.fail_close, "close")?;
        if let Some(comment) = comment {
            self.comments
                .lock()
                .unwrap()
                .push((number, comment.to_string()));
        }
        if let Some(item) = self.items.lock().unwrap().get_mut(&number) {
            item.state = ItemState::Closed;
        }
        Ok(())
    }

    fn commit_url(&self, sha: &str) -> Option<String> {
        Some(format!("https://github.com/acme/widgets/commit/{}", sha))
    }
}

// ── Agent ────────────────────────────────────────────────────────────

/// Agent that replays scripted responses, then repeats a fallback.
pub struct ScriptedAgent {
    responses: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Ok("generated".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(text: &str) -> Self {
        Self {
            fallback: Ok(text.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn always_failing(error: &str) -> Self {
        Self {
            fallback: Err(error.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(|stderr| AgentError::NonZeroExit { code: 1, stderr })
    }
}

// ── Verifier ─────────────────────────────────────────────────────────

/// Verifier with a fixed check outcome and a queue of test outcomes.
pub struct ScriptedVerifier {
    check: Verification,
    tests: Mutex<VecDeque<Verification>>,
    fallback: Verification,
    check_runs: AtomicU32,
    test_runs: AtomicU32,
}

impl ScriptedVerifier {
    pub fn passing() -> Self {
        Self {
            check: Verification::passed(""),
            tests: Mutex::new(VecDeque::new()),
            fallback: Verification::passed("all tests passed"),
            check_runs: AtomicU32::new(0),
            test_runs: AtomicU32::new(0),
        }
    }

    /// Test runs return `outcomes` in order, then keep repeating the last one.
    pub fn with_tests(outcomes: Vec<Verification>) -> Self {
        let fallback = outcomes
            .last()
            .cloned()
            .unwrap_or_else(|| Verification::passed(""));
        Self {
            tests: Mutex::new(outcomes.into()),
            fallback,
            ..Self::passing()
        }
    }

    pub fn with_check(self, check: Verification) -> Self {
        Self { check, ..self }
    }

    pub fn check_runs(&self) -> u32 {
        self.check_runs.load(Ordering::SeqCst)
    }

    pub fn test_runs(&self) -> u32 {
        self.test_runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn check(&self) -> Verification {
        self.check_runs.fetch_add(1, Ordering::SeqCst);
        self.check.clone()
    }

    async fn test(&self) -> Verification {
        self.test_runs.fetch_add(1, Ordering::SeqCst);
        self.tests
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// ── VCS ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockVcs {
    staged: Mutex<Vec<PathBuf>>,
    commits: Mutex<Vec<String>>,
    head: Mutex<Option<String>>,
    add_all_calls: AtomicU32,
    pushes: AtomicU32,
    pub nothing_to_commit: AtomicBool,
    pub fail_commit: AtomicBool,
    pub fail_push: AtomicBool,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing HEAD.
    pub fn with_head(sha: &str) -> Self {
        let vcs = Self::default();
        *vcs.head.lock().unwrap() = Some(sha.to_string());
        vcs
    }

    pub fn staged(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    pub fn add_all_calls(&self) -> u32 {
        self.add_all_calls.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Vcs for MockVcs {
    async fn add_path(&self, path: &Path) -> Result<(), VcsError> {
        self.staged.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn add_all(&self) -> Result<(), VcsError> {
        self.add_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<CommitOutcome, VcsError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(VcsError::Git(git2::Error::from_str("commit rejected")));
        }
        if self.nothing_to_commit.load(Ordering::SeqCst) {
            return Ok(CommitOutcome::NothingToCommit);
        }
        let mut commits = self.commits.lock().unwrap();
        commits.push(message.to_string());
        let sha = format!("{:040x}", commits.len());
        *self.head.lock().unwrap() = Some(sha.clone());
        Ok(CommitOutcome::Created(sha))
    }

    async fn head_sha(&self) -> Result<Option<String>, VcsError> {
        Ok(self.head.lock().unwrap().clone())
    }

    async fn push(&self) -> Result<(), VcsError> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(VcsError::Push {
                stderr: "remote rejected".to_string(),
            });
        }
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Wiring ───────────────────────────────────────────────────────────

/// Doubles plus the [`Collaborators`] bundle built from them.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub tracker: Arc<MockTracker>,
    pub agent: Arc<ScriptedAgent>,
    pub verifier: Arc<ScriptedVerifier>,
    pub vcs: Arc<MockVcs>,
    pub deps: Collaborators,
}

impl Harness {
    pub fn new(tracker: MockTracker, agent: ScriptedAgent, verifier: ScriptedVerifier) -> Self {
        Self::with_toml(tracker, agent, verifier, AdwToml::default())
    }

    pub fn with_toml(
        tracker: MockTracker,
        agent: ScriptedAgent,
        verifier: ScriptedVerifier,
        toml: AdwToml,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AdwConfig::from_parts(dir.path().to_path_buf(), toml));
        let tracker = Arc::new(tracker);
        let agent = Arc::new(agent);
        let verifier = Arc::new(verifier);
        let vcs = Arc::new(MockVcs::new());
        let deps = Collaborators {
            prompts: Arc::new(PromptRenderer::new(&config.commands_dir())),
            config,
            tracker: tracker.clone(),
            agent: agent.clone(),
            verifier: verifier.clone(),
            vcs: vcs.clone(),
        };
        Self {
            dir,
            tracker,
            agent,
            verifier,
            vcs,
            deps,
        }
    }

    /// Write a spec file under the project's specs directory and return its path.
    pub fn write_spec(&self, name: &str, content: &str) -> PathBuf {
        let specs = self.deps.config.specs_dir();
        std::fs::create_dir_all(&specs).unwrap();
        let path = specs.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}
