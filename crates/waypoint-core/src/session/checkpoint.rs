use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::checkpoint::Checkpoint;
use crate::session::SessionEngine;
use crate::session::state::{self, SessionState};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointRequest {
    pub label: Option<String>,
}

impl CheckpointRequest {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResponse {
    pub checkpoint: Checkpoint,
    /// The checkpoint opened a new branch line.
    pub forked: bool,
    /// No session was open, so one was started first.
    pub started: Option<Checkpoint>,
}

impl CheckpointResponse {
    pub fn new(checkpoint: Checkpoint, forked: bool, started: Option<Checkpoint>) -> Self {
        Self {
            checkpoint,
            forked,
            started,
        }
    }
}

pub async fn execute(engine: &SessionEngine, request: CheckpointRequest) -> Result<CheckpointResponse> {
    let ctx = engine.context().await?;
    let label = request
        .label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state::DEFAULT_LABEL.to_string());

    match SessionState::load(&*engine.storage, ctx.id).await? {
        SessionState::InSession(active) => {
            let (checkpoint, forked) = record(engine, &active, &label).await?;
            Ok(CheckpointResponse::new(checkpoint, forked, None))
        }
        SessionState::NoSession => {
            tracing::info!("no open session, starting one before checkpointing");
            let previous = engine.content.current_branch_line().await?;
            let root = super::start::open_line(engine, ctx.id, &previous).await?;
            let (checkpoint, forked) = match stage(engine, &root, 0, root.number + 1, &label).await {
                Ok(staged) => staged,
                Err(e) => {
                    super::drop_line(engine, &previous, &root.branch_line).await;
                    return Err(e);
                }
            };

            // Root and first checkpoint land together or not at all
            engine
                .storage
                .replace_tree(ctx.id, &[root.clone(), checkpoint.clone()], checkpoint.id)
                .await?;
            tracing::info!(branch_line = %root.branch_line, number = checkpoint.number, "session started with checkpoint");
            Ok(CheckpointResponse::new(checkpoint, forked, Some(root)))
        }
    }
}

/// Record the working tree as a new child of `active` and make it active.
pub(crate) async fn record(engine: &SessionEngine, active: &Checkpoint, label: &str) -> Result<(Checkpoint, bool)> {
    let next_number = engine.storage.next_number(active.context_id).await?;
    let children = engine.storage.count_children(active.id).await?;
    let (cp, forked) = stage(engine, active, children, next_number, label).await?;
    engine.storage.append_checkpoint(&cp).await?;

    tracing::info!(
        number = cp.number,
        parent = active.number,
        branch_line = %cp.branch_line,
        forked,
        "checkpoint recorded"
    );
    Ok((cp, forked))
}

/// Content half of a checkpoint: fork when `active` already has children,
/// then commit. Returns the checkpoint to persist.
///
/// A fork line whose commit fails is removed again, leaving the working tree
/// on `active`'s line with the uncommitted content still in place.
async fn stage(
    engine: &SessionEngine,
    active: &Checkpoint,
    children: usize,
    next_number: i64,
    label: &str,
) -> Result<(Checkpoint, bool)> {
    let now = chrono::Utc::now();
    let plan = state::plan_checkpoint(active, children, next_number, now);

    if plan.fork {
        engine
            .content
            .move_pending_content_onto_new_branch(&plan.branch_line, &active.token)
            .await?;
    }
    let token = match engine.content.record_change(label).await {
        Ok(token) => token,
        Err(e) => {
            if plan.fork {
                super::drop_line(engine, &active.branch_line, &plan.branch_line).await;
            }
            return Err(e);
        }
    };
    super::keep_revision(engine, &token).await;

    let cp = state::build_checkpoint(active.context_id, &plan, token, label, now);
    Ok((cp, plan.fork))
}
