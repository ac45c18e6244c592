use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::checkpoint::Checkpoint;
use crate::session::SessionEngine;
use crate::session::state::{self, SessionState};

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewindResponse {
    pub from: Checkpoint,
    pub to: Checkpoint,
}

impl RewindResponse {
    pub fn new(from: Checkpoint, to: Checkpoint) -> Self {
        Self { from, to }
    }
}

pub async fn execute(engine: &SessionEngine) -> Result<RewindResponse> {
    let ctx = engine.context().await?;
    let active = SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_session("rewind")?;
    let parent_id = state::plan_rewind(&active)?;
    let parent = engine
        .storage
        .get_checkpoint(parent_id)
        .await?
        .ok_or_else(|| {
            Error::Integrity(format!(
                "checkpoint #{} references missing parent {parent_id}",
                active.number
            ))
        })?;

    super::position_at(engine, &active, &parent).await?;
    engine.storage.set_active(ctx.id, parent.id).await?;

    tracing::info!(from = active.number, to = parent.number, "rewound");
    Ok(RewindResponse::new(active, parent))
}
