pub mod github;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteRepository {
    pub name: String,
    pub clone_url: String,
    pub web_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewRequest {
    pub number: u64,
    pub web_url: String,
}

/// Remote hosting service: repository creation and review requests.
#[async_trait::async_trait]
pub trait HostingProvider: Send + Sync {
    async fn create_remote_repository(&self, name: &str) -> Result<RemoteRepository>;
    async fn create_review_request(
        &self,
        branch_line: &str,
        base_line: &str,
        title: &str,
        body: &str,
    ) -> Result<ReviewRequest>;
}

/// Stand-in used when no hosting credentials are configured.
pub struct NoopHosting;

#[async_trait::async_trait]
impl HostingProvider for NoopHosting {
    async fn create_remote_repository(&self, name: &str) -> Result<RemoteRepository> {
        Err(Error::Hosting(format!(
            "cannot create remote repository '{name}': no hosting token configured"
        )))
    }

    async fn create_review_request(
        &self,
        branch_line: &str,
        _base_line: &str,
        _title: &str,
        _body: &str,
    ) -> Result<ReviewRequest> {
        Err(Error::Hosting(format!(
            "no hosting token configured, open a review for '{branch_line}' manually"
        )))
    }
}
