use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A repository registered with the store, keyed by its canonical path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoContext {
    pub id: Uuid,
    pub path: String,
    pub created_at: String,
}
