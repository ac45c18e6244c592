use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hosting::ReviewRequest;
use crate::model::checkpoint::Checkpoint;
use crate::session::SessionEngine;
use crate::session::state::{self, SessionState};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollapseRequest {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollapseResponse {
    pub review_line: String,
    pub token: String,
    pub title: String,
    pub collapsed_checkpoints: usize,
    pub autosaved: Option<Checkpoint>,
    pub review: Option<ReviewRequest>,
    pub warnings: Vec<String>,
}

/// Finish the session: publish its net change as one reviewable change on a
/// fresh review line, then drop the whole checkpoint tree.
///
/// Everything up to and including the push must succeed before the tree is
/// cleared; if any of it fails the working tree is put back on the active
/// checkpoint and the session stays open. The review request and branch cleanup happen after the content
/// is already published, so their failures come back as warnings.
pub async fn execute(engine: &SessionEngine, request: CollapseRequest) -> Result<CollapseResponse> {
    let ctx = engine.context().await?;
    let active = SessionState::load(&*engine.storage, ctx.id)
        .await?
        .require_session("collapse")?;

    let autosaved = if engine.content.has_pending_changes().await? {
        let (cp, _) = super::checkpoint::record(engine, &active, state::COLLAPSE_AUTOSAVE_LABEL).await?;
        Some(cp)
    } else {
        None
    };
    let head = autosaved.clone().unwrap_or(active);

    let checkpoints = engine.storage.list_checkpoints(ctx.id).await?;
    let lines = super::session_lines(&checkpoints);
    let title = request
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| head.label.clone());
    let body = request.body.unwrap_or_else(|| summarize(&checkpoints, &head));
    let review_line = state::review_line_name(chrono::Utc::now());

    engine.content.switch_to_primary_line().await?;
    let mut review_created = false;
    let published = async {
        engine.content.fetch_latest().await?;
        engine.content.create_branch_line(&review_line).await?;
        review_created = true;
        engine.content.apply_net_change(&head.token).await?;
        let token = engine.content.record_change(&title).await?;
        engine.content.publish(&review_line).await?;
        Ok::<_, Error>(token)
    }
    .await;
    let token = match published {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "collapse failed before publishing, returning to the session");
            restore_session(engine, &head, review_created.then_some(review_line.as_str())).await;
            return Err(e);
        }
    };
    tracing::info!(review_line = %review_line, token = %token, "published collapsed session");

    let mut warnings = Vec::new();
    let review = match engine
        .hosting
        .create_review_request(&review_line, &engine.primary_line, &title, &body)
        .await
    {
        Ok(review) => Some(review),
        Err(e) => {
            tracing::warn!(error = %e, "review request failed after publish");
            warnings.push(format!("review request not created: {e}"));
            None
        }
    };
    warnings.extend(super::remove_session_lines(engine, &lines).await);
    warnings.extend(super::release_revisions(engine, &checkpoints).await);

    engine.storage.clear_tree(ctx.id).await?;
    tracing::info!(checkpoints = checkpoints.len(), "session collapsed");

    Ok(CollapseResponse {
        review_line,
        token,
        title,
        collapsed_checkpoints: checkpoints.len(),
        autosaved,
        review,
        warnings,
    })
}

/// Put the working tree back on `head` after a collapse that did not get as
/// far as publishing, and drop the half-built review line.
async fn restore_session(engine: &SessionEngine, head: &Checkpoint, review_line: Option<&str>) {
    // Squash leftovers would block the switch
    if let Err(e) = engine.content.discard_local_changes().await {
        tracing::warn!(error = %e, "failed to discard partial collapse");
    }
    if let Err(e) = engine.content.switch_branch_line(&head.branch_line).await {
        tracing::warn!(line = %head.branch_line, error = %e, "failed to return to the session line");
        return;
    }
    if let Err(e) = engine.content.reset_to(&head.token).await {
        tracing::warn!(checkpoint = head.number, error = %e, "failed to reset to the active checkpoint");
    }
    if let Some(line) = review_line {
        if let Err(e) = engine.content.remove_branch_line(line).await {
            tracing::warn!(line = %line, error = %e, "failed to remove review line");
        }
    }
}

/// Default review body: the path from the root to the collapsed checkpoint.
fn summarize(checkpoints: &[Checkpoint], head: &Checkpoint) -> String {
    let mut path = Vec::new();
    let mut cursor = Some(head);
    while let Some(cp) = cursor {
        path.push(cp);
        cursor = cp
            .parent_id
            .and_then(|pid| checkpoints.iter().find(|c| c.id == pid));
        if path.len() > checkpoints.len() {
            break;
        }
    }
    path.reverse();

    let mut body = format!("Collapsed from {} checkpoint(s):\n\n", path.len());
    for cp in path {
        body.push_str(&format!("- #{} {}\n", cp.number, cp.label));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn cp(number: i64, label: &str, parent: Option<&Checkpoint>) -> Checkpoint {
        Checkpoint {
            id: Uuid::now_v7(),
            context_id: Uuid::nil(),
            number,
            token: format!("rev{number}"),
            label: label.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            parent_id: parent.map(|p| p.id),
            branch_line: "s".to_string(),
        }
    }

    #[test]
    fn test_summarize_follows_ancestry_only() {
        let root = cp(1, "start", None);
        let a = cp(2, "a", Some(&root));
        let b = cp(3, "b", Some(&a));
        let c = cp(4, "c", Some(&a));
        let all = vec![root, a, b, c.clone()];

        let body = summarize(&all, &c);
        assert_eq!(
            body,
            "Collapsed from 3 checkpoint(s):\n\n- #1 start\n- #2 a\n- #4 c\n"
        );
    }
}
