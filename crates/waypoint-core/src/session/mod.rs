pub mod abandon;
pub mod checkpoint;
pub mod collapse;
pub mod init;
pub mod jump;
pub mod rewind;
pub mod start;
pub mod state;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use crate::content::ContentBackend;
use crate::error::Result;
use crate::hosting::HostingProvider;
use crate::model::checkpoint::Checkpoint;
use crate::model::context::RepoContext;
use crate::storage::CheckpointStore;
use crate::templates::Templates;

/// Drives session operations for one repository.
///
/// Each operation checks its precondition against the store, runs the
/// content-level action, and only then writes checkpoint or active-pointer
/// changes back. A failed content action leaves the store untouched.
pub struct SessionEngine {
    pub storage: Arc<dyn CheckpointStore>,
    pub content: Arc<dyn ContentBackend>,
    pub hosting: Arc<dyn HostingProvider>,
    pub templates: Templates,
    pub repo_path: PathBuf,
    pub primary_line: String,
}

impl SessionEngine {
    pub fn new(
        storage: Arc<dyn CheckpointStore>,
        content: Arc<dyn ContentBackend>,
        hosting: Arc<dyn HostingProvider>,
        repo_path: PathBuf,
    ) -> Self {
        Self {
            storage,
            content,
            hosting,
            templates: Templates::default(),
            repo_path,
            primary_line: "main".to_string(),
        }
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_primary_line(mut self, primary_line: String) -> Self {
        self.primary_line = primary_line;
        self
    }

    pub(crate) async fn context(&self) -> Result<RepoContext> {
        self.storage
            .resolve_context(&self.repo_path.to_string_lossy())
            .await
    }

    pub async fn init(&self, request: init::InitRequest) -> Result<init::InitResponse> {
        init::execute(self, request).await
    }

    pub async fn start(&self) -> Result<start::StartResponse> {
        start::execute(self).await
    }

    pub async fn checkpoint(&self, request: checkpoint::CheckpointRequest) -> Result<checkpoint::CheckpointResponse> {
        checkpoint::execute(self, request).await
    }

    pub async fn rewind(&self) -> Result<rewind::RewindResponse> {
        rewind::execute(self).await
    }

    pub async fn jump(&self, request: jump::JumpRequest) -> Result<jump::JumpResponse> {
        jump::execute(self, request).await
    }

    pub async fn collapse(&self, request: collapse::CollapseRequest) -> Result<collapse::CollapseResponse> {
        collapse::execute(self, request).await
    }

    pub async fn abandon(&self) -> Result<abandon::AbandonResponse> {
        abandon::execute(self).await
    }

    pub async fn status(&self) -> Result<status::SessionStatus> {
        status::status(self).await
    }

    pub async fn tree(&self) -> Result<String> {
        status::tree(self).await
    }

    pub async fn log(&self) -> Result<Vec<Checkpoint>> {
        status::log(self).await
    }
}

/// Put the working tree at `target`, coming from `current`.
///
/// Uncommitted changes to tracked files are discarded.
pub(crate) async fn position_at(engine: &SessionEngine, current: &Checkpoint, target: &Checkpoint) -> Result<()> {
    if engine.content.has_pending_changes().await? {
        tracing::warn!(checkpoint = current.number, "discarding uncommitted changes");
        engine.content.reset_to(&current.token).await?;
    }
    if target.branch_line != current.branch_line {
        engine.content.switch_branch_line(&target.branch_line).await?;
    }
    engine.content.reset_to(&target.token).await
}

/// Distinct branch lines used by a session, in first-use order.
pub(crate) fn session_lines(checkpoints: &[Checkpoint]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for cp in checkpoints {
        if !lines.contains(&cp.branch_line) {
            lines.push(cp.branch_line.clone());
        }
    }
    lines
}

/// Return to the primary line and delete the session's lines.
///
/// Failures are collected as warnings; the caller has already finished the
/// part of the operation that matters.
pub(crate) async fn remove_session_lines(engine: &SessionEngine, lines: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Err(e) = engine.content.switch_to_primary_line().await {
        tracing::warn!(error = %e, "failed to switch back to the primary line");
        warnings.push(format!("could not switch to {}: {e}", engine.primary_line));
        return warnings;
    }
    for line in lines {
        if let Err(e) = engine.content.remove_branch_line(line).await {
            tracing::warn!(line = %line, error = %e, "failed to remove session branch line");
            warnings.push(format!("could not remove branch line {line}: {e}"));
        }
    }
    warnings
}

/// Undo a branch line created by an operation that then failed: return to
/// `back_to` and delete `line`. The caller reports the original error, so
/// cleanup failures are only logged.
pub(crate) async fn drop_line(engine: &SessionEngine, back_to: &str, line: &str) {
    if let Err(e) = engine.content.switch_branch_line(back_to).await {
        tracing::warn!(line = %back_to, error = %e, "failed to return to branch line");
        return;
    }
    if let Err(e) = engine.content.remove_branch_line(line).await {
        tracing::warn!(line = %line, error = %e, "failed to remove branch line");
    }
}

/// Pin a freshly recorded revision so rewinding its line cannot orphan it.
pub(crate) async fn keep_revision(engine: &SessionEngine, token: &str) {
    if let Err(e) = engine.content.keep_revision(token).await {
        tracing::warn!(token = %token, error = %e, "failed to pin checkpoint revision");
    }
}

/// Drop the pins of every checkpoint in a finished session.
pub(crate) async fn release_revisions(engine: &SessionEngine, checkpoints: &[Checkpoint]) -> Vec<String> {
    let mut warnings = Vec::new();
    for cp in checkpoints {
        if let Err(e) = engine.content.release_revision(&cp.token).await {
            tracing::warn!(number = cp.number, error = %e, "failed to release checkpoint revision");
            warnings.push(format!("could not release revision of checkpoint #{}: {e}", cp.number));
        }
    }
    warnings
}
