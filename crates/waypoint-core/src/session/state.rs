//! Session state machine.
//!
//! A context is either in `NoSession` (no active pointer) or `InSession`
//! (active pointer set). The functions here decide whether an operation is
//! legal and where the next checkpoint goes; they never touch the store or
//! the working tree.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::checkpoint::Checkpoint;
use crate::storage::CheckpointStore;

pub const START_LABEL: &str = "start";
pub const DEFAULT_LABEL: &str = "checkpoint";
pub const JUMP_AUTOSAVE_LABEL: &str = "auto-save before jump";
pub const COLLAPSE_AUTOSAVE_LABEL: &str = "auto-save before collapse";

const SESSION_LINE_PREFIX: &str = "session";
const REVIEW_LINE_PREFIX: &str = "review";
const LINE_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    InSession(Checkpoint),
}

impl SessionState {
    /// Read the context's active pointer and resolve it to a checkpoint.
    pub async fn load(storage: &dyn CheckpointStore, context_id: Uuid) -> Result<Self> {
        let Some(active_id) = storage.get_active(context_id).await? else {
            return Ok(SessionState::NoSession);
        };
        let active = storage.get_checkpoint(active_id).await?.ok_or_else(|| {
            Error::Integrity(format!("active pointer references missing checkpoint {active_id}"))
        })?;
        if active.context_id != context_id {
            return Err(Error::Integrity(format!(
                "active checkpoint {active_id} belongs to another repository"
            )));
        }
        Ok(SessionState::InSession(active))
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::InSession(_))
    }

    pub fn active(&self) -> Option<&Checkpoint> {
        match self {
            SessionState::NoSession => None,
            SessionState::InSession(cp) => Some(cp),
        }
    }

    /// The active checkpoint, or a precondition error naming `operation`.
    pub fn require_session(self, operation: &str) -> Result<Checkpoint> {
        match self {
            SessionState::InSession(cp) => Ok(cp),
            SessionState::NoSession => Err(Error::Precondition(format!(
                "cannot {operation}: no session is open, start one first"
            ))),
        }
    }

    pub fn require_no_session(&self) -> Result<()> {
        match self {
            SessionState::NoSession => Ok(()),
            SessionState::InSession(cp) => Err(Error::Precondition(format!(
                "a session is already open (active checkpoint #{}), collapse or abandon it first",
                cp.number
            ))),
        }
    }
}

/// Where the next checkpoint goes relative to the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointPlan {
    pub number: i64,
    pub parent_id: Uuid,
    pub branch_line: String,
    /// True when the active checkpoint already has children and a new line starts here.
    pub fork: bool,
}

/// Fork rule: a checkpoint whose parent already has children opens a new branch line.
pub fn plan_checkpoint(
    active: &Checkpoint,
    active_children: usize,
    next_number: i64,
    now: DateTime<Utc>,
) -> CheckpointPlan {
    let fork = active_children > 0;
    let branch_line = if fork {
        fork_line_name(now, next_number)
    } else {
        active.branch_line.clone()
    };
    CheckpointPlan {
        number: next_number,
        parent_id: active.id,
        branch_line,
        fork,
    }
}

/// Parent of the active checkpoint; the session root cannot be rewound.
pub fn plan_rewind(active: &Checkpoint) -> Result<Uuid> {
    active.parent_id.ok_or_else(|| {
        Error::Precondition(format!(
            "cannot rewind: checkpoint #{} is the start of the session",
            active.number
        ))
    })
}

pub fn session_line_name(now: DateTime<Utc>) -> String {
    format!("{SESSION_LINE_PREFIX}-{}", now.format(LINE_TIME_FORMAT))
}

pub fn fork_line_name(now: DateTime<Utc>, number: i64) -> String {
    format!("{SESSION_LINE_PREFIX}-{}-{number}", now.format(LINE_TIME_FORMAT))
}

pub fn review_line_name(now: DateTime<Utc>) -> String {
    format!("{REVIEW_LINE_PREFIX}-{}", now.format(LINE_TIME_FORMAT))
}

pub fn root_checkpoint(context_id: Uuid, token: String, branch_line: String, now: DateTime<Utc>) -> Checkpoint {
    Checkpoint {
        id: Uuid::now_v7(),
        context_id,
        number: 1,
        token,
        label: START_LABEL.to_string(),
        created_at: now.to_rfc3339(),
        parent_id: None,
        branch_line,
    }
}

pub fn build_checkpoint(
    context_id: Uuid,
    plan: &CheckpointPlan,
    token: String,
    label: &str,
    now: DateTime<Utc>,
) -> Checkpoint {
    Checkpoint {
        id: Uuid::now_v7(),
        context_id,
        number: plan.number,
        token,
        label: label.to_string(),
        created_at: now.to_rfc3339(),
        parent_id: Some(plan.parent_id),
        branch_line: plan.branch_line.clone(),
    }
}
