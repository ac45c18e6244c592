use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::checkpoint::Checkpoint;
use crate::model::context::RepoContext;
use crate::render;
use crate::session::SessionEngine;
use crate::session::state::SessionState;

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub context: RepoContext,
    pub active: Option<Checkpoint>,
    pub checkpoints: usize,
    pub pending_changes: bool,
}

impl SessionStatus {
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

pub async fn status(engine: &SessionEngine) -> Result<SessionStatus> {
    let context = engine.context().await?;
    let state = SessionState::load(&*engine.storage, context.id).await?;
    let checkpoints = engine.storage.list_checkpoints(context.id).await?.len();
    let pending_changes = engine.content.has_pending_changes().await?;
    Ok(SessionStatus {
        context,
        active: state.active().cloned(),
        checkpoints,
        pending_changes,
    })
}

pub async fn tree(engine: &SessionEngine) -> Result<String> {
    let ctx = engine.context().await?;
    let active = SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_session("show the tree")?;
    let checkpoints = engine.storage.list_checkpoints(ctx.id).await?;
    render::render(&checkpoints, Some(active.id))
}

pub async fn log(engine: &SessionEngine) -> Result<Vec<Checkpoint>> {
    let ctx = engine.context().await?;
    engine.storage.list_checkpoints(ctx.id).await
}
