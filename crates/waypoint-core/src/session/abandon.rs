use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionEngine;
use crate::session::state::SessionState;

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonResponse {
    pub discarded_checkpoints: usize,
    pub removed_lines: Vec<String>,
    pub warnings: Vec<String>,
}

impl AbandonResponse {
    pub fn new(discarded_checkpoints: usize, removed_lines: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            discarded_checkpoints,
            removed_lines,
            warnings,
        }
    }
}

/// Throw the session away without publishing anything.
pub async fn execute(engine: &SessionEngine) -> Result<AbandonResponse> {
    let ctx = engine.context().await?;
    SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_session("abandon the session")?;
    let checkpoints = engine.storage.list_checkpoints(ctx.id).await?;
    let lines = super::session_lines(&checkpoints);

    engine.content.discard_local_changes().await?;
    let mut warnings = super::remove_session_lines(engine, &lines).await;
    warnings.extend(super::release_revisions(engine, &checkpoints).await);

    engine.storage.clear_tree(ctx.id).await?;
    tracing::info!(checkpoints = checkpoints.len(), "session abandoned");
    Ok(AbandonResponse::new(checkpoints.len(), lines, warnings))
}
