//! Core types for pr-phase-monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository identity (owner + name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
}

impl RepoRef {
    /// Create a repository reference
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    /// Reviewer approved
    Approved,
    /// Reviewer requested changes (blocking)
    ChangesRequested,
    /// Reviewer left comments only
    Commented,
    /// Review was dismissed
    Dismissed,
    /// Review not yet submitted
    Pending,
    /// Any state the hosting service adds later
    Other,
}

impl ReviewState {
    /// Parse the GraphQL `PullRequestReviewState` enum value
    pub fn from_graphql(value: &str) -> Self {
        match value {
            "APPROVED" => Self::Approved,
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "COMMENTED" => Self::Commented,
            "DISMISSED" => Self::Dismissed,
            "PENDING" => Self::Pending,
            _ => Self::Other,
        }
    }
}

/// One submitted review on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
    /// Author login; `None` when the account was deleted
    pub author: Option<String>,
    /// Review state
    pub state: ReviewState,
    /// Optional review body
    pub body: Option<String>,
}

/// An inline review comment thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewThread {
    /// Whether the thread was resolved
    pub is_resolved: bool,
    /// Whether the code under the thread has since changed
    pub is_outdated: bool,
    /// Number of comments in the thread
    pub comment_count: u32,
}

impl ReviewThread {
    /// Unresolved and not outdated: the only thread state needing attention
    pub const fn needs_attention(&self) -> bool {
        !self.is_resolved && !self.is_outdated
    }
}

/// A top-level (non-inline) comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralComment {
    /// Author login; `None` when the account was deleted
    pub author: Option<String>,
    /// Total participants across all reactions on the comment
    pub reaction_count: u32,
}

/// Point-in-time view of one pull request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    /// Web URL, used as the stable key
    pub url: String,
    /// PR title
    pub title: String,
    /// Repository the PR belongs to
    pub repo: RepoRef,
    /// PR author login
    pub author: Option<String>,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// Every submitted review, oldest first
    pub reviews: Vec<ReviewEvent>,
    /// Latest review per reviewer
    pub latest_reviews: Vec<ReviewEvent>,
    /// Logins with an outstanding review request
    pub requested_reviewers: Vec<String>,
    /// General comments
    pub comments: Vec<GeneralComment>,
    /// Inline review threads
    pub threads: Vec<ReviewThread>,
    /// When the PR was opened
    pub created_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of one open issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSnapshot {
    /// Web URL
    pub url: String,
    /// Issue number
    pub number: u64,
    /// Issue title
    pub title: String,
    /// Repository the issue belongs to
    pub repo: RepoRef,
    /// Label names
    pub labels: Vec<String>,
    /// Assignee logins
    pub assignees: Vec<String>,
    /// When the issue was opened
    pub created_at: DateTime<Utc>,
}

impl IssueSnapshot {
    /// Case-insensitive label check
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Squash all commits into one
    #[default]
    Squash,
    /// Create a merge commit
    Merge,
    /// Rebase commits onto base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}
