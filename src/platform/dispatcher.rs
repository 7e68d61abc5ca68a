//! The production dispatcher: GitHub for repository actions, local browser,
//! and ntfy for notifications

use super::{ActionDispatcher, GitHubService, NtfyNotifier, open_in_browser};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{IssueSnapshot, MergeMethod};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Routes each action to the collaborator that performs it
pub struct LiveDispatcher {
    github: Arc<GitHubService>,
    notifier: Option<NtfyNotifier>,
    /// Login issues are assigned to
    assignee: String,
}

impl LiveDispatcher {
    /// Create a dispatcher
    pub fn new(
        github: Arc<GitHubService>,
        notifier: Option<NtfyNotifier>,
        assignee: impl Into<String>,
    ) -> Self {
        Self {
            github,
            notifier,
            assignee: assignee.into(),
        }
    }

    /// Swap the notifier after a config reload
    pub fn set_notifier(&mut self, notifier: Option<NtfyNotifier>) {
        self.notifier = notifier;
    }
}

#[async_trait]
impl ActionDispatcher for LiveDispatcher {
    async fn open(&self, url: &str) -> Result<()> {
        open_in_browser(url).await
    }

    async fn post_comment(&self, url: &str, body: &str) -> Result<()> {
        self.github.create_comment(url, body).await
    }

    async fn mark_ready(&self, url: &str) -> Result<()> {
        self.github.mark_ready_for_review(url).await
    }

    async fn merge(&self, url: &str, method: MergeMethod) -> Result<()> {
        self.github.merge_pull_request(url, method).await
    }

    async fn send_notification(&self, url: &str, title: &str) -> Result<()> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or_else(|| Error::Notification("no [ntfy] topic configured".to_string()))?;
        notifier.send("PR ready for review", title, url).await
    }

    async fn assign_issue(&self, issue: &IssueSnapshot) -> Result<()> {
        self.github.add_assignee(issue, &self.assignee).await
    }

    fn on_config_reload(&mut self, config: &Config) {
        match config.ntfy.as_ref().map(NtfyNotifier::new).transpose() {
            Ok(notifier) => self.set_notifier(notifier),
            Err(e) => warn!(error = %e, "keeping previous notifier"),
        }
    }
}
