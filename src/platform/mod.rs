//! Platform services: where snapshots come from and where actions go
//!
//! The monitor only talks to the two traits here. The GitHub implementation
//! covers fetching and repository-side actions; browser opening and push
//! notifications are separate local collaborators combined by
//! [`LiveDispatcher`].

mod browser;
mod dispatcher;
mod github;
mod graphql;
mod ntfy;

pub use browser::open_in_browser;
pub use dispatcher::LiveDispatcher;
pub use github::GitHubService;
pub use ntfy::NtfyNotifier;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{IssueSnapshot, MergeMethod, PullRequestSnapshot, RepoRef};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Source of pull request and issue snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch every open pull request being watched
    async fn fetch_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>>;

    /// Fetch every open issue being watched
    async fn fetch_issues(&self) -> Result<Vec<IssueSnapshot>>;

    /// Fetch a single pull request by URL
    async fn fetch_pull_request(&self, url: &str) -> Result<PullRequestSnapshot>;
}

#[async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for Arc<T> {
    async fn fetch_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>> {
        (**self).fetch_pull_requests().await
    }

    async fn fetch_issues(&self) -> Result<Vec<IssueSnapshot>> {
        (**self).fetch_issues().await
    }

    async fn fetch_pull_request(&self, url: &str) -> Result<PullRequestSnapshot> {
        (**self).fetch_pull_request(url).await
    }
}

/// Side-effecting commands
///
/// `Err` means "not done"; the monitor retries on a later cycle.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Open a URL in the user's browser
    async fn open(&self, url: &str) -> Result<()>;

    /// Post a general comment on a pull request
    async fn post_comment(&self, url: &str, body: &str) -> Result<()>;

    /// Mark a draft pull request ready for review
    async fn mark_ready(&self, url: &str) -> Result<()>;

    /// Merge a pull request
    async fn merge(&self, url: &str, method: MergeMethod) -> Result<()>;

    /// Send a push notification about a pull request
    async fn send_notification(&self, url: &str, title: &str) -> Result<()>;

    /// Assign an issue to the agent
    async fn assign_issue(&self, issue: &IssueSnapshot) -> Result<()>;

    /// Pick up settings from a reloaded configuration
    fn on_config_reload(&mut self, _config: &Config) {}
}

/// Owner, repo and number parsed from a pull request or issue URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Repository
    pub repo: RepoRef,
    /// PR or issue number
    pub number: u64,
}

/// Parse `https://<host>/<owner>/<repo>/(pull|issues)/<number>`
pub fn parse_item_url(input: &str) -> Result<ItemRef> {
    let url = Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, repo, "pull" | "pulls" | "issues", number, ..] => {
            let number = number
                .parse::<u64>()
                .map_err(|_| Error::InvalidUrl(format!("{input}: bad number '{number}'")))?;
            Ok(ItemRef {
                repo: RepoRef::new(*owner, *repo),
                number,
            })
        }
        _ => Err(Error::InvalidUrl(format!(
            "{input}: expected <owner>/<repo>/pull/<number>"
        ))),
    }
}
