use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::types::{ChangeKind, FileChange};
use super::{PrError, SourceControl};
use crate::config::Target;

const USER_AGENT: &str = concat!("pr-describer/", env!("CARGO_PKG_VERSION"));
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const PER_PAGE: usize = 100;

/// GitHub REST implementation of [`SourceControl`].
pub struct GitHubClient {
    client: Client,
    api_base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct CommitItem {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Deserialize)]
struct FileItem {
    filename: String,
    status: String,
}

#[derive(Deserialize)]
struct PullResponse {
    body: Option<String>,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    body: &'a str,
}

impl GitHubClient {
    pub fn new(api_base_url: &str, token: String) -> Self {
        Self {
            client: Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn pull_url(&self, target: &Target) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base_url, target.owner, target.repo, target.pr_number
        )
    }

    fn authorized(&self, request: RequestBuilder, accept: &str) -> RequestBuilder {
        request
            .header("User-Agent", USER_AGENT)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, PrError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PrError::Api {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                message,
            });
        }
        Ok(response)
    }

    /// Walk a list endpoint page by page until a short page comes back.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        url: &str,
        endpoint: &str,
    ) -> Result<Vec<T>, PrError> {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .client
                .get(url)
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<T> = self
                .send(self.authorized(request, JSON_MEDIA_TYPE), endpoint)
                .await?
                .json()
                .await?;
            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(endpoint, items = items.len(), pages = page, "fetched list");
        Ok(items)
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    #[instrument(skip(self), fields(pr = target.pr_number))]
    async fn list_commits(&self, target: &Target) -> Result<Vec<String>, PrError> {
        let url = format!("{}/commits", self.pull_url(target));
        let commits: Vec<CommitItem> = self.get_all_pages(&url, "commits").await?;
        Ok(commits.into_iter().map(|c| c.commit.message).collect())
    }

    #[instrument(skip(self), fields(pr = target.pr_number))]
    async fn list_files(&self, target: &Target) -> Result<Vec<FileChange>, PrError> {
        let url = format!("{}/files", self.pull_url(target));
        let files: Vec<FileItem> = self.get_all_pages(&url, "files").await?;
        Ok(files
            .into_iter()
            .map(|f| FileChange::new(f.filename, ChangeKind::from_status(&f.status)))
            .collect())
    }

    #[instrument(skip(self), fields(pr = target.pr_number))]
    async fn pull_request_body(&self, target: &Target) -> Result<String, PrError> {
        let request = self.client.get(self.pull_url(target));
        let pull: PullResponse = self
            .send(self.authorized(request, JSON_MEDIA_TYPE), "pull request")
            .await?
            .json()
            .await?;
        Ok(pull.body.unwrap_or_default())
    }

    #[instrument(skip(self), fields(pr = target.pr_number))]
    async fn diff(&self, target: &Target) -> Result<String, PrError> {
        let request = self.client.get(self.pull_url(target));
        let text = self
            .send(self.authorized(request, DIFF_MEDIA_TYPE), "diff")
            .await?
            .text()
            .await?;
        debug!(diff_bytes = text.len(), "received PR diff");
        Ok(text)
    }

    #[instrument(skip(self, body), fields(pr = target.pr_number, body_chars = body.len()))]
    async fn update_body(&self, target: &Target, body: &str) -> Result<(), PrError> {
        let request = self
            .client
            .patch(self.pull_url(target))
            .json(&UpdateRequest { body });
        self.send(self.authorized(request, JSON_MEDIA_TYPE), "update pull request")
            .await?;
        Ok(())
    }
}
