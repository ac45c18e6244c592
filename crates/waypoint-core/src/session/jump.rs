use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::checkpoint::Checkpoint;
use crate::session::SessionEngine;
use crate::session::state::{self, SessionState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpRequest {
    pub number: i64,
}

impl JumpRequest {
    pub fn new(number: i64) -> Self {
        Self { number }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpResponse {
    pub from: Checkpoint,
    pub to: Checkpoint,
    /// Checkpoint recorded for uncommitted content before jumping.
    pub autosaved: Option<Checkpoint>,
}

impl JumpResponse {
    pub fn new(from: Checkpoint, to: Checkpoint, autosaved: Option<Checkpoint>) -> Self {
        Self { from, to, autosaved }
    }
}

pub async fn execute(engine: &SessionEngine, request: JumpRequest) -> Result<JumpResponse> {
    let ctx = engine.context().await?;
    let active = SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_session("jump")?;
    let target = engine
        .storage
        .get_checkpoint_by_number(ctx.id, request.number)
        .await?
        .ok_or_else(|| Error::NotFound(format!("checkpoint #{} not found", request.number)))?;

    let autosaved = if engine.content.has_pending_changes().await? {
        let (cp, _) = super::checkpoint::record(engine, &active, state::JUMP_AUTOSAVE_LABEL).await?;
        Some(cp)
    } else {
        None
    };
    let current = autosaved.as_ref().unwrap_or(&active);

    super::position_at(engine, current, &target).await?;
    engine.storage.set_active(ctx.id, target.id).await?;

    tracing::info!(from = current.number, to = target.number, "jumped");
    Ok(JumpResponse::new(current.clone(), target, autosaved))
}
