//! Mock snapshot source and action dispatcher for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use pr_phase_monitor::config::Config;
use pr_phase_monitor::error::{Error, Result};
use pr_phase_monitor::platform::{ActionDispatcher, SnapshotSource};
use pr_phase_monitor::types::{IssueSnapshot, MergeMethod, PullRequestSnapshot};
use std::collections::HashSet;
use std::sync::Mutex;

/// Injected fetch failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// A network-style error; the monitor retries
    Transient(String),
    /// Credentials rejected; the monitor stops
    Auth(String),
}

impl FetchFailure {
    fn to_error(&self) -> Error {
        match self {
            Self::Transient(msg) => Error::Platform(msg.clone()),
            Self::Auth(msg) => Error::Auth(msg.clone()),
        }
    }
}

/// Snapshot source serving canned pull requests and issues
///
/// Responses can be swapped between cycles through `&self`, so tests can
/// drive a monitor that owns the source.
#[derive(Default)]
pub struct MockSource {
    pull_requests: Mutex<Vec<PullRequestSnapshot>>,
    issues: Mutex<Vec<IssueSnapshot>>,
    // Call tracking
    fetch_pr_calls: Mutex<usize>,
    fetch_issue_calls: Mutex<usize>,
    // Error injection
    pr_failure: Mutex<Option<FetchFailure>>,
    issue_failure: Mutex<Option<String>>,
}

impl MockSource {
    /// Source serving `prs` and no issues
    pub fn with_pull_requests(prs: Vec<PullRequestSnapshot>) -> Self {
        let source = Self::default();
        source.set_pull_requests(prs);
        source
    }

    /// Replace the pull requests returned from now on
    pub fn set_pull_requests(&self, prs: Vec<PullRequestSnapshot>) {
        *self.pull_requests.lock().unwrap() = prs;
    }

    /// Replace the issues returned from now on
    pub fn set_issues(&self, issues: Vec<IssueSnapshot>) {
        *self.issues.lock().unwrap() = issues;
    }

    // === Error injection methods ===

    /// Make `fetch_pull_requests` fail until cleared
    pub fn fail_pull_requests(&self, failure: FetchFailure) {
        *self.pr_failure.lock().unwrap() = Some(failure);
    }

    /// Make `fetch_issues` fail until cleared
    pub fn fail_issues(&self, msg: &str) {
        *self.issue_failure.lock().unwrap() = Some(msg.to_string());
    }

    /// Clear all injected failures
    pub fn recover(&self) {
        *self.pr_failure.lock().unwrap() = None;
        *self.issue_failure.lock().unwrap() = None;
    }

    // === Call inspection ===

    /// Number of `fetch_pull_requests` calls
    pub fn fetch_pr_calls(&self) -> usize {
        *self.fetch_pr_calls.lock().unwrap()
    }

    /// Number of `fetch_issues` calls
    pub fn fetch_issue_calls(&self) -> usize {
        *self.fetch_issue_calls.lock().unwrap()
    }
}

#[async_trait]
impl SnapshotSource for MockSource {
    async fn fetch_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>> {
        *self.fetch_pr_calls.lock().unwrap() += 1;
        if let Some(failure) = self.pr_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }
        Ok(self.pull_requests.lock().unwrap().clone())
    }

    async fn fetch_issues(&self) -> Result<Vec<IssueSnapshot>> {
        *self.fetch_issue_calls.lock().unwrap() += 1;
        if let Some(msg) = self.issue_failure.lock().unwrap().as_ref() {
            return Err(Error::Platform(msg.clone()));
        }
        Ok(self.issues.lock().unwrap().clone())
    }

    async fn fetch_pull_request(&self, url: &str) -> Result<PullRequestSnapshot> {
        self.pull_requests
            .lock()
            .unwrap()
            .iter()
            .find(|pr| pr.url == url)
            .cloned()
            .ok_or_else(|| Error::Platform(format!("pull request not found: {url}")))
    }
}

/// Operation names accepted by [`MockDispatcher::fail`]
pub const OPS: [&str; 6] = ["open", "comment", "mark_ready", "merge", "notify", "assign"];

/// One recorded dispatcher call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCall {
    /// `open`
    Open(String),
    /// `post_comment`
    Comment {
        /// Target URL
        url: String,
        /// Comment body
        body: String,
    },
    /// `mark_ready`
    MarkReady(String),
    /// `merge`
    Merge {
        /// Target URL
        url: String,
        /// Merge method
        method: MergeMethod,
    },
    /// `send_notification`
    Notify {
        /// Target URL
        url: String,
        /// PR title
        title: String,
    },
    /// `assign_issue`
    Assign(String),
}

/// Dispatcher that records calls instead of performing them
///
/// Failed calls are recorded too, so tests can see retries.
#[derive(Default)]
pub struct MockDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    failing: Mutex<HashSet<&'static str>>,
    reloads: Mutex<usize>,
}

impl MockDispatcher {
    /// Create a dispatcher where every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make an operation (one of [`OPS`]) fail until [`Self::succeed`]
    pub fn fail(&self, op: &'static str) {
        assert!(OPS.contains(&op), "unknown op {op}");
        self.failing.lock().unwrap().insert(op);
    }

    /// Let an operation succeed again
    pub fn succeed(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Number of config reloads seen
    pub fn reloads(&self) -> usize {
        *self.reloads.lock().unwrap()
    }

    fn record(&self, op: &'static str, call: DispatchCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::Platform(format!("injected {op} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl ActionDispatcher for MockDispatcher {
    async fn open(&self, url: &str) -> Result<()> {
        self.record("open", DispatchCall::Open(url.to_string()))
    }

    async fn post_comment(&self, url: &str, body: &str) -> Result<()> {
        self.record(
            "comment",
            DispatchCall::Comment {
                url: url.to_string(),
                body: body.to_string(),
            },
        )
    }

    async fn mark_ready(&self, url: &str) -> Result<()> {
        self.record("mark_ready", DispatchCall::MarkReady(url.to_string()))
    }

    async fn merge(&self, url: &str, method: MergeMethod) -> Result<()> {
        self.record(
            "merge",
            DispatchCall::Merge {
                url: url.to_string(),
                method,
            },
        )
    }

    async fn send_notification(&self, url: &str, title: &str) -> Result<()> {
        self.record(
            "notify",
            DispatchCall::Notify {
                url: url.to_string(),
                title: title.to_string(),
            },
        )
    }

    async fn assign_issue(&self, issue: &IssueSnapshot) -> Result<()> {
        self.record("assign", DispatchCall::Assign(issue.url.clone()))
    }

    fn on_config_reload(&mut self, _config: &Config) {
        *self.reloads.lock().unwrap() += 1;
    }
}
