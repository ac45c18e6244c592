pub mod duckdb;
pub mod migrations;

use crate::error::Result;
use crate::model::checkpoint::Checkpoint;
use crate::model::context::RepoContext;
use uuid::Uuid;

/// Durable checkpoint trees, one per repository context.
///
/// Every call is a short unit of work. `next_number` is always derived from
/// the rows currently stored. `append_checkpoint`, `replace_tree` and
/// `clear_tree` are all-or-nothing.
#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    // Contexts
    async fn resolve_context(&self, path: &str) -> Result<RepoContext>;

    // Active pointer
    async fn get_active(&self, context_id: Uuid) -> Result<Option<Uuid>>;
    async fn set_active(&self, context_id: Uuid, checkpoint_id: Uuid) -> Result<()>;

    // Checkpoints
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<()>;
    async fn get_checkpoint(&self, id: Uuid) -> Result<Option<Checkpoint>>;
    async fn get_checkpoint_by_number(&self, context_id: Uuid, number: i64) -> Result<Option<Checkpoint>>;
    async fn list_checkpoints(&self, context_id: Uuid) -> Result<Vec<Checkpoint>>;
    async fn next_number(&self, context_id: Uuid) -> Result<i64>;
    async fn count_children(&self, checkpoint_id: Uuid) -> Result<usize>;

    /// Insert a new checkpoint and make it the active one in a single transaction.
    async fn append_checkpoint(&self, cp: &Checkpoint) -> Result<()>;

    // Whole-tree operations
    /// Drop the context's tree and store `checkpoints` in its place with
    /// `active` as the active pointer, in a single transaction.
    async fn replace_tree(&self, context_id: Uuid, checkpoints: &[Checkpoint], active: Uuid) -> Result<()>;
    async fn clear_tree(&self, context_id: Uuid) -> Result<()>;
}
