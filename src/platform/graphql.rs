//! GraphQL queries and response types for snapshot fetching

use crate::types::{
    GeneralComment, IssueSnapshot, PullRequestSnapshot, RepoRef, ReviewEvent, ReviewState,
    ReviewThread,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Fields fetched for every pull request
const PULL_REQUEST_FIELDS: &str = r"
    url
    title
    isDraft
    createdAt
    author { login }
    repository { name owner { login } }
    reviewRequests(first: 20) {
        nodes {
            requestedReviewer {
                ... on User { login }
                ... on Bot { login }
                ... on Team { slug }
            }
        }
    }
    reviews(first: 100) { nodes { author { login } state body } }
    latestReviews(first: 50) { nodes { author { login } state body } }
    comments(last: 50) { nodes { author { login } reactions { totalCount } } }
    reviewThreads(first: 100) { nodes { isResolved isOutdated comments { totalCount } } }
";

/// Search query for open pull requests, paginated
pub fn search_pull_requests_query() -> String {
    format!(
        r"query SearchPullRequests($q: String!, $cursor: String) {{
            search(query: $q, type: ISSUE, first: 50, after: $cursor) {{
                pageInfo {{ hasNextPage endCursor }}
                nodes {{ ... on PullRequest {{ {PULL_REQUEST_FIELDS} }} }}
            }}
        }}"
    )
}

/// Lookup of a single pull request
pub fn pull_request_query() -> String {
    format!(
        r"query PullRequest($owner: String!, $name: String!, $number: Int!) {{
            repository(owner: $owner, name: $name) {{
                pullRequest(number: $number) {{ {PULL_REQUEST_FIELDS} }}
            }}
        }}"
    )
}

/// Search query for open issues, paginated
pub const SEARCH_ISSUES_QUERY: &str = r"
    query SearchIssues($q: String!, $cursor: String) {
        search(query: $q, type: ISSUE, first: 50, after: $cursor) {
            pageInfo { hasNextPage endCursor }
            nodes {
                ... on Issue {
                    url
                    number
                    title
                    createdAt
                    repository { name owner { login } }
                    labels(first: 20) { nodes { name } }
                    assignees(first: 10) { nodes { login } }
                }
            }
        }
    }
";

/// Login of the authenticated user
pub const VIEWER_QUERY: &str = "query { viewer { login } }";

/// Mark a pull request ready for review
pub const MARK_READY_MUTATION: &str = r"
    mutation MarkPullRequestReadyForReview($pullRequestId: ID!) {
        markPullRequestReadyForReview(input: { pullRequestId: $pullRequestId }) {
            pullRequest { isDraft }
        }
    }
";

#[derive(Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<Option<T>>,
}

impl<T> Connection<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchData<T> {
    pub search: SearchResult<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    pub page_info: PageInfo,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<SearchNode<T>>,
}

/// Search nodes of another type deserialize as an empty object
#[derive(Deserialize)]
#[serde(untagged)]
pub enum SearchNode<T> {
    Item(T),
    Other(serde_json::Value),
}

#[derive(Deserialize)]
pub struct ViewerData {
    pub viewer: Actor,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryData {
    pub repository: Option<RepositoryPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryPullRequest {
    pub pull_request: Option<PullRequestNode>,
}

#[derive(Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

impl From<Repository> for RepoRef {
    fn from(repo: Repository) -> Self {
        Self::new(repo.owner.login, repo.name)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub requested_reviewer: Option<RequestedReviewer>,
}

#[derive(Deserialize)]
pub struct RequestedReviewer {
    pub login: Option<String>,
    pub slug: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewNode {
    pub author: Option<Actor>,
    pub state: String,
    pub body: Option<String>,
}

impl From<ReviewNode> for ReviewEvent {
    fn from(node: ReviewNode) -> Self {
        Self {
            author: node.author.map(|a| a.login),
            state: ReviewState::from_graphql(&node.state),
            body: node.body.filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u32,
}

#[derive(Deserialize)]
pub struct CommentNode {
    pub author: Option<Actor>,
    pub reactions: TotalCount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    pub is_resolved: bool,
    pub is_outdated: bool,
    pub comments: TotalCount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub url: String,
    pub title: String,
    pub is_draft: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<Actor>,
    pub repository: Repository,
    #[serde(default)]
    pub review_requests: Connection<ReviewRequest>,
    #[serde(default)]
    pub reviews: Connection<ReviewNode>,
    #[serde(default)]
    pub latest_reviews: Connection<ReviewNode>,
    #[serde(default)]
    pub comments: Connection<CommentNode>,
    #[serde(default)]
    pub review_threads: Connection<ThreadNode>,
}

impl From<PullRequestNode> for PullRequestSnapshot {
    fn from(pr: PullRequestNode) -> Self {
        Self {
            url: pr.url,
            title: pr.title,
            repo: pr.repository.into(),
            author: pr.author.map(|a| a.login),
            is_draft: pr.is_draft,
            reviews: pr.reviews.into_items().map(Into::into).collect(),
            latest_reviews: pr.latest_reviews.into_items().map(Into::into).collect(),
            requested_reviewers: pr
                .review_requests
                .into_items()
                .filter_map(|r| r.requested_reviewer)
                .filter_map(|r| r.login.or(r.slug))
                .collect(),
            comments: pr
                .comments
                .into_items()
                .map(|c| GeneralComment {
                    author: c.author.map(|a| a.login),
                    reaction_count: c.reactions.total_count,
                })
                .collect(),
            threads: pr
                .review_threads
                .into_items()
                .map(|t| ReviewThread {
                    is_resolved: t.is_resolved,
                    is_outdated: t.is_outdated,
                    comment_count: t.comments.total_count,
                })
                .collect(),
            created_at: pr.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct LabelNode {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueNode {
    pub url: String,
    pub number: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub repository: Repository,
    #[serde(default)]
    pub labels: Connection<LabelNode>,
    #[serde(default)]
    pub assignees: Connection<Actor>,
}

impl From<IssueNode> for IssueSnapshot {
    fn from(issue: IssueNode) -> Self {
        Self {
            url: issue.url,
            number: issue.number,
            title: issue.title,
            repo: issue.repository.into(),
            labels: issue.labels.into_items().map(|l| l.name).collect(),
            assignees: issue.assignees.into_items().map(|a| a.login).collect(),
            created_at: issue.created_at,
        }
    }
}
