use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::checkpoint::Checkpoint;
use crate::session::SessionEngine;
use crate::session::state::{self, SessionState};

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub checkpoint: Checkpoint,
}

impl StartResponse {
    pub fn new(checkpoint: Checkpoint) -> Self {
        Self { checkpoint }
    }
}

pub async fn execute(engine: &SessionEngine) -> Result<StartResponse> {
    let ctx = engine.context().await?;
    SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_no_session()?;

    let previous = engine.content.current_branch_line().await?;
    let root = open_line(engine, ctx.id, &previous).await?;
    // Any tree left behind by an interrupted collapse goes with the swap
    engine
        .storage
        .replace_tree(ctx.id, std::slice::from_ref(&root), root.id)
        .await?;

    tracing::info!(
        context_id = %ctx.id,
        branch_line = %root.branch_line,
        token = %root.short_token(),
        "session started"
    );
    Ok(StartResponse::new(root))
}

/// Content half of opening a session: a new branch line off `previous` with
/// the root change recorded on it.
///
/// Nothing is persisted; the returned root is written by the caller together
/// with whatever else its operation records. If recording fails, the new line
/// is removed and the working tree is back on `previous`.
pub(crate) async fn open_line(engine: &SessionEngine, context_id: Uuid, previous: &str) -> Result<Checkpoint> {
    let now = chrono::Utc::now();
    let branch_line = state::session_line_name(now);

    engine.content.create_branch_line(&branch_line).await?;
    let token = match engine.content.record_change(state::START_LABEL).await {
        Ok(token) => token,
        Err(e) => {
            super::drop_line(engine, previous, &branch_line).await;
            return Err(e);
        }
    };
    super::keep_revision(engine, &token).await;

    Ok(state::root_checkpoint(context_id, token, branch_line, now))
}
