use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One node of a repository's checkpoint tree.
///
/// Checkpoints are immutable once written. The only state that changes
/// around them is which one the context's active pointer references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub id: Uuid,
    pub context_id: Uuid,
    /// Sequence number within the context, starting at 1 for the session root.
    pub number: i64,
    /// Revision token handed back by the content backend (a commit hash for git).
    pub token: String,
    pub label: String,
    pub created_at: String,
    pub parent_id: Option<Uuid>,
    pub branch_line: String,
}

impl Checkpoint {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Abbreviated revision token for display.
    pub fn short_token(&self) -> &str {
        let end = self
            .token
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.token.len());
        &self.token[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_checkpoint(token: &str, parent_id: Option<Uuid>) -> Checkpoint {
        Checkpoint {
            id: Uuid::now_v7(),
            context_id: Uuid::now_v7(),
            number: 1,
            token: token.to_string(),
            label: "start".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            parent_id,
            branch_line: "session-20260101-000000".to_string(),
        }
    }

    #[test]
    fn test_checkpoint_serde() {
        let cp = make_checkpoint("3f2a9c1d7e", None);
        let json = serde_json::to_string(&cp).unwrap();
        let deserialized: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(cp, deserialized);
    }

    #[test]
    fn test_short_token() {
        assert_eq!(make_checkpoint("3f2a9c1d7e88", None).short_token(), "3f2a9c1d");
        assert_eq!(make_checkpoint("abc", None).short_token(), "abc");
    }

    #[test]
    fn test_is_root() {
        assert!(make_checkpoint("a", None).is_root());
        assert!(!make_checkpoint("a", Some(Uuid::now_v7())).is_root());
    }
}
