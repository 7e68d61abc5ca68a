//! GitHub platform service implementation

use super::graphql::{
    GraphQlResponse, IssueNode, MARK_READY_MUTATION, PullRequestNode, RepositoryData,
    SEARCH_ISSUES_QUERY, SearchData, SearchNode, VIEWER_QUERY, ViewerData, pull_request_query,
    search_pull_requests_query,
};
use super::{ItemRef, SnapshotSource, parse_item_url};
use crate::error::{Error, Result};
use crate::types::{IssueSnapshot, MergeMethod, PullRequestSnapshot};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Upper bound on search pages per query
const MAX_SEARCH_PAGES: usize = 20;

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    /// Owners whose repositories are searched; empty means the viewer
    owners: Vec<String>,
}

/// Surface GraphQL-level errors, then unwrap the data
fn into_data<T>(response: GraphQlResponse<T>) -> Result<T> {
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::GitHubApi(format!(
            "GraphQL error: {}",
            messages.join(", ")
        )));
    }
    response
        .data
        .ok_or_else(|| Error::GitHubApi("No data in GraphQL response".to_string()))
}

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(token: &str, host: Option<&str>, owners: Vec<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(h) = host {
            let base_url = format!("https://{h}/api/v3");
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::GitHubApi(e.to_string()))?;
        }

        let client = builder
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        Ok(Self { client, owners })
    }

    async fn graphql<T: DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        let response: GraphQlResponse<T> = self.client.graphql(&body).await?;
        into_data(response)
    }

    /// Login of the authenticated user
    ///
    /// Also serves as the startup credential check.
    pub async fn viewer_login(&self) -> Result<String> {
        let data: ViewerData = self
            .graphql(serde_json::json!({ "query": VIEWER_QUERY }))
            .await?;
        Ok(data.viewer.login)
    }

    async fn search_queries(&self, kind: &str) -> Result<Vec<String>> {
        let owners = if self.owners.is_empty() {
            vec![self.viewer_login().await?]
        } else {
            self.owners.clone()
        };
        Ok(owners
            .iter()
            .map(|owner| format!("is:{kind} is:open archived:false user:{owner}"))
            .collect())
    }

    /// Run a paginated search, keeping only nodes of type `T`
    async fn search<T: DeserializeOwned>(&self, query: &str, search: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_SEARCH_PAGES {
            let data: SearchData<T> = self
                .graphql(serde_json::json!({
                    "query": query,
                    "variables": { "q": search, "cursor": cursor },
                }))
                .await?;

            items.extend(data.search.nodes.into_iter().filter_map(|n| match n {
                SearchNode::Item(item) => Some(item),
                SearchNode::Other(_) => None,
            }));

            match data.search.page_info {
                page if page.has_next_page && page.end_cursor.is_some() => {
                    cursor = page.end_cursor;
                }
                _ => break,
            }
        }
        Ok(items)
    }

    async fn node_id(&self, item: &ItemRef) -> Result<String> {
        let pr = self
            .client
            .pulls(&item.repo.owner, &item.repo.name)
            .get(item.number)
            .await?;
        pr.node_id
            .ok_or_else(|| Error::GitHubApi("PR missing node_id for GraphQL mutation".to_string()))
    }

    /// Post a general comment on a pull request or issue
    pub async fn create_comment(&self, url: &str, body: &str) -> Result<()> {
        let item = parse_item_url(url)?;
        debug!(repo = %item.repo, number = item.number, "creating comment");
        self.client
            .issues(&item.repo.owner, &item.repo.name)
            .create_comment(item.number, body)
            .await?;
        debug!(repo = %item.repo, number = item.number, "created comment");
        Ok(())
    }

    /// Convert a draft pull request to ready for review
    pub async fn mark_ready_for_review(&self, url: &str) -> Result<()> {
        let item = parse_item_url(url)?;
        debug!(repo = %item.repo, number = item.number, "marking PR ready for review");
        let node_id = self.node_id(&item).await?;

        let _: serde_json::Value = self
            .graphql(serde_json::json!({
                "query": MARK_READY_MUTATION,
                "variables": { "pullRequestId": node_id },
            }))
            .await?;

        debug!(repo = %item.repo, number = item.number, "marked PR ready for review");
        Ok(())
    }

    /// Merge a pull request
    pub async fn merge_pull_request(&self, url: &str, method: MergeMethod) -> Result<()> {
        let item = parse_item_url(url)?;
        debug!(repo = %item.repo, number = item.number, %method, "merging PR");

        let octocrab_method = match method {
            MergeMethod::Squash => octocrab::params::pulls::MergeMethod::Squash,
            MergeMethod::Merge => octocrab::params::pulls::MergeMethod::Merge,
            MergeMethod::Rebase => octocrab::params::pulls::MergeMethod::Rebase,
        };

        let result = self
            .client
            .pulls(&item.repo.owner, &item.repo.name)
            .merge(item.number)
            .method(octocrab_method)
            .send()
            .await
            .map_err(|e| Error::GitHubApi(format!("Merge failed: {e}")))?;

        if !result.merged {
            return Err(Error::GitHubApi(format!(
                "Merge refused: {}",
                result.message.unwrap_or_default()
            )));
        }

        debug!(repo = %item.repo, number = item.number, sha = ?result.sha, "merge complete");
        Ok(())
    }

    /// Add an assignee to an issue
    pub async fn add_assignee(&self, issue: &IssueSnapshot, login: &str) -> Result<()> {
        debug!(url = %issue.url, login, "assigning issue");
        self.client
            .issues(&issue.repo.owner, &issue.repo.name)
            .add_assignees(issue.number, &[login])
            .await?;
        debug!(url = %issue.url, login, "assigned issue");
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for GitHubService {
    async fn fetch_pull_requests(&self) -> Result<Vec<PullRequestSnapshot>> {
        let query = search_pull_requests_query();
        let mut snapshots = Vec::new();
        for search in self.search_queries("pr").await? {
            debug!(%search, "searching pull requests");
            let nodes: Vec<PullRequestNode> = self.search(&query, &search).await?;
            snapshots.extend(nodes.into_iter().map(PullRequestSnapshot::from));
        }
        debug!(count = snapshots.len(), "fetched pull requests");
        Ok(snapshots)
    }

    async fn fetch_issues(&self) -> Result<Vec<IssueSnapshot>> {
        let mut issues = Vec::new();
        for search in self.search_queries("issue").await? {
            debug!(%search, "searching issues");
            let nodes: Vec<IssueNode> = self.search(SEARCH_ISSUES_QUERY, &search).await?;
            issues.extend(nodes.into_iter().map(IssueSnapshot::from));
        }
        debug!(count = issues.len(), "fetched issues");
        Ok(issues)
    }

    async fn fetch_pull_request(&self, url: &str) -> Result<PullRequestSnapshot> {
        let item = parse_item_url(url)?;
        let data: RepositoryData = self
            .graphql(serde_json::json!({
                "query": pull_request_query(),
                "variables": {
                    "owner": item.repo.owner,
                    "name": item.repo.name,
                    "number": item.number,
                },
            }))
            .await?;

        data.repository
            .and_then(|r| r.pull_request)
            .map(PullRequestSnapshot::from)
            .ok_or_else(|| Error::Platform(format!("pull request not found: {url}")))
    }
}
