use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hosting::{HostingProvider, RemoteRepository, ReviewRequest};

pub struct GitHubHosting {
    api_url: String,
    token: String,
    owner: Option<String>,
    repo: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
}

#[derive(Deserialize)]
struct CreateRepoResponse {
    name: String,
    clone_url: String,
    html_url: String,
}

#[derive(Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatePullResponse {
    number: u64,
    html_url: String,
}

impl GitHubHosting {
    pub fn new(api_url: String, token: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            owner: None,
            repo: None,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .user_agent(concat!("waypoint/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "failed to build HTTP client with timeouts, using default");
                    reqwest::Client::default()
                }),
        }
    }

    /// Repository that review requests are opened against.
    pub fn with_repository(mut self, owner: String, repo: String) -> Self {
        self.owner = Some(owner);
        self.repo = Some(repo);
        self
    }

    fn pulls_url(&self) -> Result<String> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok(format!("{}/repos/{owner}/{repo}/pulls", self.api_url)),
            _ => Err(Error::Hosting(
                "no GitHub repository configured for review requests".to_string(),
            )),
        }
    }

    async fn post<T: Serialize + Sync, R: DeserializeOwned + Send>(&self, url: &str, payload: &T) -> Result<R> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Hosting(format!("GitHub API error {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl HostingProvider for GitHubHosting {
    async fn create_remote_repository(&self, name: &str) -> Result<RemoteRepository> {
        let url = format!("{}/user/repos", self.api_url);
        let resp: CreateRepoResponse = self
            .post(&url, &CreateRepoRequest { name, private: true })
            .await?;
        tracing::info!(name = %resp.name, url = %resp.html_url, "created remote repository");
        Ok(RemoteRepository {
            name: resp.name,
            clone_url: resp.clone_url,
            web_url: resp.html_url,
        })
    }

    async fn create_review_request(
        &self,
        branch_line: &str,
        base_line: &str,
        title: &str,
        body: &str,
    ) -> Result<ReviewRequest> {
        let url = self.pulls_url()?;
        let resp: CreatePullResponse = self
            .post(
                &url,
                &CreatePullRequest {
                    title,
                    head: branch_line,
                    base: base_line,
                    body,
                },
            )
            .await?;
        tracing::info!(number = resp.number, url = %resp.html_url, "opened pull request");
        Ok(ReviewRequest {
            number: resp.number,
            web_url: resp.html_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulls_url() {
        let hosting = GitHubHosting::new("https://api.github.com/".to_string(), "t".to_string())
            .with_repository("octo".to_string(), "demo".to_string());
        assert_eq!(
            hosting.pulls_url().unwrap(),
            "https://api.github.com/repos/octo/demo/pulls"
        );
    }

    #[tokio::test]
    async fn test_review_request_without_repository_fails() {
        let hosting = GitHubHosting::new("https://api.github.com".to_string(), "t".to_string());
        let err = hosting
            .create_review_request("review-1", "main", "title", "body")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Hosting(_)));
    }

    #[test]
    fn test_pull_request_payload() {
        let payload = CreatePullRequest {
            title: "Add parser",
            head: "review-20260101-000000",
            base: "main",
            body: "",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["head"], "review-20260101-000000");
        assert_eq!(json["base"], "main");
    }

    #[tokio::test]
    #[ignore] // Requires GITHUB_TOKEN
    async fn test_github_create_repository() {
        let token = std::env::var("GITHUB_TOKEN").unwrap();
        let hosting = GitHubHosting::new("https://api.github.com".to_string(), token);
        let repo = hosting.create_remote_repository("waypoint-smoke-test").await.unwrap();
        assert_eq!(repo.name, "waypoint-smoke-test");
    }
}
