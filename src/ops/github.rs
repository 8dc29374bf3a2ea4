#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;
use tracing::instrument;

use super::git::RemoteInfo;
use super::github_curl::GithubCurlClient;
use crate::error::Error;

/// Revision (commit oid) to tag name.
pub type TagMap = HashMap<String, String>;

/// Message prefix GitHub uses when the head branch already has an open PR.
pub const PR_ALREADY_EXISTS: &str = "A pull request already exists for";

// -----------------------------------------------------------------------------
// GithubOps trait

/// Operations for interacting with GitHub
#[cfg_attr(test, automock)]
pub trait GithubOps {
    /// Look up the node id and default branch of a repository
    async fn repo_info(&self, remote: &RemoteInfo) -> Result<RepoInfo>;

    /// Most recent `limit` tags of a repository, keyed by the commit they point at.
    /// Repositories without tags (or without data) give an empty map.
    async fn list_recent_tags(&self, owner: &str, repo: &str, limit: u32) -> Result<TagMap>;

    /// Create a PR, or report GitHub's message if one is already open for the head branch.
    async fn create_pull_request(&self, request: &NewPullRequest) -> Result<PullRequestOutcome>;

    /// Resolve a login to a user node id
    async fn user_id(&self, login: &str) -> Result<String>;

    /// Request reviews from the given users, keeping existing reviewers
    async fn request_reviews(&self, pr_id: &str, user_ids: &[String]) -> Result<()>;
}

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub id: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub repository_id: String,
    pub title: String,
    pub body: String,
    pub head_branch: String,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PullRequestRef {
    pub id: String,
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestOutcome {
    Created(PullRequestRef),
    /// A PR for the head branch is already open; holds the service message
    AlreadyExists(String),
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

impl<T> GraphqlResponse<T> {
    /// Turn reported errors into [`Error::Api`]
    fn into_data(self) -> Result<Option<T>> {
        if !self.errors.is_empty() {
            return Err(Error::Api {
                messages: self.errors.into_iter().map(|e| e.message).collect(),
            }
            .into());
        }
        Ok(self.data)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestInput<'a> {
    repository_id: &'a str,
    base_ref_name: &'a str,
    head_ref_name: &'a str,
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct RepositoryData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TagsData {
    repository: Option<TagsRepository>,
}

#[derive(Debug, Deserialize)]
struct TagsRepository {
    refs: Option<TagConnection>,
}

#[derive(Debug, Deserialize)]
struct TagConnection {
    nodes: Option<Vec<Option<TagNode>>>,
}

#[derive(Debug, Deserialize)]
struct TagNode {
    name: String,
    target: Option<TagTarget>,
}

/// A lightweight tag targets the commit directly; an annotated tag targets a
/// tag object whose own target is the commit.
#[derive(Debug, Deserialize)]
struct TagTarget {
    oid: String,
    target: Option<CommitTarget>,
}

#[derive(Debug, Deserialize)]
struct CommitTarget {
    oid: String,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
struct UserNode {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestData {
    create_pull_request: Option<CreatePullRequestPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePullRequestPayload {
    pull_request: Option<PullRequestRef>,
}

// -----------------------------------------------------------------------------
// Documents

const REPO_INFO_QUERY: &str = r#"
query RepoInfo($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    defaultBranchRef {
      name
    }
  }
}"#;

const RECENT_TAGS_QUERY: &str = r#"
query RecentTags($owner: String!, $name: String!, $limit: Int!) {
  repository(owner: $owner, name: $name) {
    refs(refPrefix: "refs/tags/", first: $limit, orderBy: {field: TAG_COMMIT_DATE, direction: DESC}) {
      nodes {
        name
        target {
          oid
          ... on Tag {
            target {
              oid
            }
          }
        }
      }
    }
  }
}"#;

const USER_ID_QUERY: &str = r#"
query UserId($login: String!) {
  user(login: $login) {
    id
  }
}"#;

const CREATE_PULL_REQUEST_MUTATION: &str = r#"
mutation CreatePullRequest($input: CreatePullRequestInput!) {
  createPullRequest(input: $input) {
    pullRequest {
      id
      number
      url
    }
  }
}"#;

const REQUEST_REVIEWS_MUTATION: &str = r#"
mutation RequestReviews($input: RequestReviewsInput!) {
  requestReviews(input: $input) {
    pullRequest {
      number
    }
  }
}"#;

// -----------------------------------------------------------------------------
// RealGithub

/// Real implementation that talks to the GitHub GraphQL API
pub struct RealGithub {
    http_client: GithubCurlClient,
}

impl RealGithub {
    pub fn new(token: String, endpoint: String) -> Self {
        Self {
            http_client: GithubCurlClient::new(token, endpoint),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphqlResponse<T>> {
        let body = request_body(query, variables)?;
        let response = self.http_client.post(&body).await?;
        serde_json::from_str(&response).context("Failed to parse GraphQL response")
    }
}

impl GithubOps for RealGithub {
    #[instrument(skip(self))]
    async fn repo_info(&self, remote: &RemoteInfo) -> Result<RepoInfo> {
        let variables = json!({ "owner": remote.owner, "name": remote.name });
        let data = self
            .execute::<RepositoryData>(REPO_INFO_QUERY, variables)
            .await?
            .into_data()?;

        repo_info_from(data, remote)
    }

    #[instrument(skip(self))]
    async fn list_recent_tags(&self, owner: &str, repo: &str, limit: u32) -> Result<TagMap> {
        let variables = json!({ "owner": owner, "name": repo, "limit": limit });
        let data = self
            .execute::<TagsData>(RECENT_TAGS_QUERY, variables)
            .await?
            .into_data()?;

        let tags = tag_map(data);
        info!(count = tags.len(), "fetched tags");
        Ok(tags)
    }

    #[instrument(skip_all, fields(head = %request.head_branch, base = %request.base_branch))]
    async fn create_pull_request(
        &self,
        request: &NewPullRequest,
    ) -> Result<PullRequestOutcome> {
        let input = CreatePullRequestInput {
            repository_id: &request.repository_id,
            base_ref_name: &request.base_branch,
            head_ref_name: &request.head_branch,
            title: &request.title,
            body: &request.body,
        };
        let response = self
            .execute::<CreatePullRequestData>(CREATE_PULL_REQUEST_MUTATION, json!({ "input": input }))
            .await?;

        let outcome = pull_request_outcome(response)?;
        if let PullRequestOutcome::Created(pr) = &outcome {
            info!(number = pr.number, url = %pr.url, "created pull request");
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn user_id(&self, login: &str) -> Result<String> {
        let data = self
            .execute::<UserData>(USER_ID_QUERY, json!({ "login": login }))
            .await?
            .into_data()?;

        user_id_from(data, login)
    }

    #[instrument(skip(self))]
    async fn request_reviews(&self, pr_id: &str, user_ids: &[String]) -> Result<()> {
        let variables = request_reviews_variables(pr_id, user_ids);
        self.execute::<serde_json::Value>(REQUEST_REVIEWS_MUTATION, variables)
            .await?
            .into_data()?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Response handling

fn request_body(query: &str, variables: serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(&GraphqlRequest { query, variables })?)
}

fn repo_info_from(data: Option<RepositoryData>, remote: &RemoteInfo) -> Result<RepoInfo> {
    let repository = data.and_then(|d| d.repository).ok_or_else(|| {
        Error::api(format!(
            "Could not resolve to a Repository with the name '{}/{}'",
            remote.owner, remote.name
        ))
    })?;
    let default_branch = repository
        .default_branch_ref
        .ok_or_else(|| Error::api("Repository has no default branch"))?
        .name;

    Ok(RepoInfo {
        id: repository.id,
        default_branch,
    })
}

fn user_id_from(data: Option<UserData>, login: &str) -> Result<String> {
    data.and_then(|d| d.user).map(|user| user.id).ok_or_else(|| {
        Error::api(format!(
            "Could not resolve to a User with the login of '{}'",
            login
        ))
        .into()
    })
}

/// `union` keeps reviewers that were already requested
fn request_reviews_variables(pr_id: &str, user_ids: &[String]) -> serde_json::Value {
    json!({
        "input": {
            "pullRequestId": pr_id,
            "userIds": user_ids,
            "union": true,
        }
    })
}

/// Collect tag nodes into a revision -> name map, treating missing data as no tags
fn tag_map(data: Option<TagsData>) -> TagMap {
    let nodes = data
        .and_then(|d| d.repository)
        .and_then(|r| r.refs)
        .and_then(|refs| refs.nodes)
        .unwrap_or_default();

    // Nodes arrive newest first; insert oldest first so the newest tag wins
    // when several tags share a commit
    nodes
        .into_iter()
        .rev()
        .flatten()
        .filter_map(|node| {
            let target = node.target?;
            let revision = match target.target {
                Some(commit) => commit.oid,
                None => target.oid,
            };
            Some((revision, node.name))
        })
        .collect()
}

/// A lone "already exists" error is a benign outcome; anything else is an error
fn pull_request_outcome(
    response: GraphqlResponse<CreatePullRequestData>,
) -> Result<PullRequestOutcome> {
    if let [error] = response.errors.as_slice() {
        if error.message.starts_with(PR_ALREADY_EXISTS) {
            info!("{}", error.message);
            return Ok(PullRequestOutcome::AlreadyExists(error.message.clone()));
        }
    }

    let pr = response
        .into_data()?
        .and_then(|d| d.create_pull_request)
        .and_then(|payload| payload.pull_request)
        .ok_or_else(|| Error::api("createPullRequest returned no pull request"))?;
    Ok(PullRequestOutcome::Created(pr))
}
