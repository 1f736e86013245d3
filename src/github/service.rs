//! GitHub service implementation

use crate::error::{DEFAULT_RATE_LIMIT_WAIT, Error, RateLimitKind, Result};
use crate::github::GitHubApi;
use crate::types::{Author, CommitRef, RawPullRequest, RepoConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = "relnotes";

#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
}

#[derive(Deserialize)]
struct ComparePayload {
    commits: Vec<ApiCommit>,
}

#[derive(Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
    html_url: String,
}

#[derive(Deserialize)]
struct ApiPullRequest {
    number: u64,
    #[serde(default)]
    title: String,
    html_url: String,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    user: Option<ApiUser>,
}

impl From<ApiPullRequest> for RawPullRequest {
    fn from(pr: ApiPullRequest) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            url: pr.html_url,
            merged_at: pr.merged_at,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            author: pr.user.map(|u| Author {
                username: u.login,
                url: u.html_url,
            }),
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Turn a non-success GitHub response into an [`Error`].
///
/// 403 and 429 responses that describe a rate limit become
/// [`Error::RateLimited`]: a secondary limit when the body says so, using
/// `retry-after` when present; a primary limit when
/// `x-ratelimit-remaining` is zero, waiting until `x-ratelimit-reset`.
/// Everything else becomes [`Error::Http`].
pub fn classify_response(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    now: DateTime<Utc>,
) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());

    if matches!(status.as_u16(), 403 | 429) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        if message.to_lowercase().contains("secondary rate") {
            let retry_after = header("retry-after")
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(DEFAULT_RATE_LIMIT_WAIT, Duration::from_secs);
            return Error::RateLimited {
                kind: RateLimitKind::Secondary,
                retry_after,
            };
        }

        if header("x-ratelimit-remaining") == Some("0") {
            let retry_after = header("x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .map_or(DEFAULT_RATE_LIMIT_WAIT, |reset| {
                    let secs = (reset - now.timestamp()).max(0);
                    Duration::from_secs(secs.unsigned_abs())
                });
            return Error::RateLimited {
                kind: RateLimitKind::Primary,
                retry_after,
            };
        }
    }

    Error::Http {
        status: status.as_u16(),
        message,
    }
}

/// GitHub service using octocrab and reqwest
pub struct GitHubService {
    client: Octocrab,
    config: RepoConfig,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests (need status and rate-limit headers)
    http_client: Client,
    /// REST API root, always ending in `/`
    api_base: Url,
}

impl GitHubService {
    /// Create a service for github.com or, with `config.host`, GitHub Enterprise
    pub fn new(token: &str, config: RepoConfig) -> Result<Self> {
        let api_base = config.host.as_ref().map_or_else(
            || "https://api.github.com".to_string(),
            |h| format!("https://{h}/api/v3"),
        );
        Self::with_api_url(token, config, &api_base)
    }

    /// Create a service against an explicit REST API root
    pub fn with_api_url(token: &str, config: RepoConfig, api_url: &str) -> Result<Self> {
        let mut api_base = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid API URL {api_url}: {e}")))?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_url.trim_end_matches('/'))
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(&format!(
                "repos/{}/{}/{path}",
                urlencoding::encode(&self.config.owner),
                urlencoding::encode(&self.config.repo)
            ))
            .map_err(|e| Error::Internal(format!("bad endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_response(status, &headers, &body, Utc::now()));
        }

        response
            .json()
            .await
            .map_err(|e| Error::GitHubApi(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl GitHubApi for GitHubService {
    async fn head_commit(&self, branch: &str) -> Result<CommitRef> {
        debug!(branch, "fetching head commit");
        let commit = self
            .client
            .commits(&self.config.owner, &self.config.repo)
            .get(branch)
            .await?;
        debug!(sha = %commit.sha, "got head commit");
        Ok(CommitRef::new(commit.sha))
    }

    async fn latest_release_tag(&self) -> Result<Option<String>> {
        debug!("fetching latest release");
        let result = self
            .client
            .repos(&self.config.owner, &self.config.repo)
            .releases()
            .get_latest()
            .await;

        match result {
            Ok(release) => {
                debug!(tag = %release.tag_name, "got latest release");
                Ok(Some(release.tag_name))
            }
            Err(e) => match Error::from(e) {
                Error::Http { status: 404, .. } => {
                    debug!("no published release");
                    Ok(None)
                }
                other => Err(other),
            },
        }
    }

    async fn compare_commits(
        &self,
        base: &CommitRef,
        head: &CommitRef,
    ) -> Result<Vec<CommitRef>> {
        debug!(%base, %head, "comparing commits");
        let path = format!(
            "compare/{}...{}",
            urlencoding::encode(base.as_str()),
            urlencoding::encode(head.as_str())
        );
        let payload: ComparePayload = self.get_json(self.endpoint(&path)?).await?;
        let commits: Vec<CommitRef> = payload
            .commits
            .into_iter()
            .map(|c| CommitRef::new(c.sha))
            .collect();
        debug!(count = commits.len(), "compared commits");
        Ok(commits)
    }

    async fn list_commits_page(
        &self,
        head: &CommitRef,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<CommitRef>> {
        debug!(%head, page, "listing commits");
        let mut url = self.endpoint("commits")?;
        url.query_pairs_mut()
            .append_pair("sha", head.as_str())
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        let commits: Vec<ApiCommit> = self.get_json(url).await?;
        Ok(commits.into_iter().map(|c| CommitRef::new(c.sha)).collect())
    }

    async fn list_pull_requests_for_commit(&self, sha: &CommitRef) -> Result<Vec<RawPullRequest>> {
        debug!(%sha, "listing PRs for commit");
        let path = format!("commits/{}/pulls", urlencoding::encode(sha.as_str()));
        let prs: Vec<ApiPullRequest> = self.get_json(self.endpoint(&path)?).await?;
        let result: Vec<RawPullRequest> = prs.into_iter().map(Into::into).collect();
        debug!(%sha, count = result.len(), "listed PRs for commit");
        Ok(result)
    }

    fn config(&self) -> &RepoConfig {
        &self.config
    }
}
