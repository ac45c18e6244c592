pub mod git;

use crate::error::Result;

/// Content-level operations on the working repository.
///
/// The session machinery only tracks metadata about checkpoints; every change
/// to files, commits or branches goes through this trait.
#[async_trait::async_trait]
pub trait ContentBackend: Send + Sync {
    async fn init(&self) -> Result<()>;
    async fn current_revision_token(&self) -> Result<String>;
    async fn current_branch_line(&self) -> Result<String>;

    /// Create branch line `name` at the current position and switch to it.
    async fn create_branch_line(&self, name: &str) -> Result<()>;
    /// Switch to an existing branch line without touching its content.
    async fn switch_branch_line(&self, name: &str) -> Result<()>;
    /// Move the current branch line to `token`, discarding uncommitted content.
    async fn reset_to(&self, token: &str) -> Result<()>;

    async fn has_pending_changes(&self) -> Result<bool>;
    /// Record everything in the working tree as one change and return its token.
    async fn record_change(&self, label: &str) -> Result<String>;
    /// Start branch line `name` at `token`, carrying uncommitted content across.
    async fn move_pending_content_onto_new_branch(&self, name: &str, token: &str) -> Result<()>;
    /// Stage the net content difference between the current position and `token`.
    async fn apply_net_change(&self, token: &str) -> Result<()>;

    /// Keep the revision `token` alive even when no branch line reaches it.
    async fn keep_revision(&self, token: &str) -> Result<()>;
    async fn release_revision(&self, token: &str) -> Result<()>;

    async fn publish(&self, branch_line: &str) -> Result<()>;
    async fn fetch_latest(&self) -> Result<()>;
    async fn discard_local_changes(&self) -> Result<()>;
    async fn remove_branch_line(&self, name: &str) -> Result<()>;
    async fn switch_to_primary_line(&self) -> Result<()>;

    async fn has_remote(&self) -> Result<bool>;
    async fn add_remote(&self, url: &str) -> Result<()>;
}
