//! Shared test fixtures

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::{DispatchCall, FetchFailure, MockDispatcher, MockSource};

use chrono::{DateTime, TimeDelta, Utc};
use pr_phase_monitor::config::Config;
use pr_phase_monitor::types::{
    GeneralComment, IssueSnapshot, PullRequestSnapshot, RepoRef, ReviewEvent, ReviewState,
    ReviewThread,
};

/// Default reviewer bot login
pub const REVIEWER: &str = "copilot-pull-request-reviewer";

/// Default agent bot login
pub const AGENT: &str = "copilot-swe-agent";

/// Seconds after the epoch
pub fn t(secs: i64) -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(secs)
}

/// Parse a config document, panicking on errors
pub fn config(doc: &str) -> Config {
    Config::from_toml_str(doc).unwrap()
}

/// A review by `author`
pub fn review(author: &str, state: ReviewState) -> ReviewEvent {
    ReviewEvent {
        author: Some(author.to_string()),
        state,
        body: None,
    }
}

/// An unresolved, current thread
pub fn open_thread() -> ReviewThread {
    ReviewThread {
        is_resolved: false,
        is_outdated: false,
        comment_count: 1,
    }
}

/// Bare open PR in `owner/name` with no reviews (classifies as agent-working)
pub fn make_pr(owner: &str, name: &str, number: u64) -> PullRequestSnapshot {
    PullRequestSnapshot {
        url: format!("https://github.com/{owner}/{name}/pull/{number}"),
        title: format!("PR {number}"),
        repo: RepoRef::new(owner, name),
        author: Some(AGENT.to_string()),
        is_draft: false,
        reviews: Vec::new(),
        latest_reviews: Vec::new(),
        requested_reviewers: Vec::new(),
        comments: Vec::new(),
        threads: Vec::new(),
        created_at: Some(t(0)),
    }
}

/// Replace the review history, keeping `latest_reviews` consistent
pub fn with_reviews(mut pr: PullRequestSnapshot, reviews: Vec<ReviewEvent>) -> PullRequestSnapshot {
    pr.latest_reviews = reviews.last().cloned().into_iter().collect();
    pr.reviews = reviews;
    pr
}

/// Draft with a reviewer requested (classifies as draft)
pub fn draft_pr(number: u64) -> PullRequestSnapshot {
    let mut pr = make_pr("acme", "widgets", number);
    pr.is_draft = true;
    pr.requested_reviewers = vec!["maintainer".to_string()];
    pr
}

/// Reviewer bot requested changes (classifies as needs-fix)
pub fn needs_fix_pr(number: u64) -> PullRequestSnapshot {
    with_reviews(
        make_pr("acme", "widgets", number),
        vec![review(REVIEWER, ReviewState::ChangesRequested)],
    )
}

/// Reviewer bot commented with nothing open (classifies as ready-for-review)
pub fn ready_pr(number: u64) -> PullRequestSnapshot {
    with_reviews(
        make_pr("acme", "widgets", number),
        vec![review(REVIEWER, ReviewState::Commented)],
    )
}

/// A general comment with `reactions` reactions
pub fn comment(reactions: u32) -> GeneralComment {
    GeneralComment {
        author: Some("maintainer".to_string()),
        reaction_count: reactions,
    }
}

/// Open, unassigned issue in `acme/<repo>` created `day` days after the epoch
pub fn make_issue(repo: &str, number: u64, day: i64, labels: &[&str]) -> IssueSnapshot {
    IssueSnapshot {
        url: format!("https://github.com/acme/{repo}/issues/{number}"),
        number,
        title: format!("Issue {number}"),
        repo: RepoRef::new("acme", repo),
        labels: labels.iter().map(ToString::to_string).collect(),
        assignees: Vec::new(),
        created_at: t(day * 86_400),
    }
}
