use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::checkpoint::Checkpoint;
use crate::model::context::RepoContext;
use crate::storage::CheckpointStore;
use uuid::Uuid;

const CHECKPOINT_COLUMNS: &str =
    "id, context_id, number, token, label, created_at, parent_id, branch_line";

pub struct DuckDbStore {
    conn: Arc<Mutex<duckdb::Connection>>,
}

impl DuckDbStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = duckdb::Connection::open(path)?;
        super::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = duckdb::Connection::open_in_memory()?;
        super::migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_uuid(idx: usize, s: &str) -> duckdb::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, Box::new(e))
    })
}

fn row_to_checkpoint(row: &duckdb::Row<'_>) -> duckdb::Result<Checkpoint> {
    let id_str: String = row.get(0)?;
    let context_str: String = row.get(1)?;
    let parent_id_str: Option<String> = row.get(6)?;

    Ok(Checkpoint {
        id: parse_uuid(0, &id_str)?,
        context_id: parse_uuid(1, &context_str)?,
        number: row.get(2)?,
        token: row.get(3)?,
        label: row.get(4)?,
        created_at: row.get(5)?,
        parent_id: parent_id_str.map(|s| parse_uuid(6, &s)).transpose()?,
        branch_line: row.get(7)?,
    })
}

fn row_to_context(row: &duckdb::Row<'_>) -> duckdb::Result<RepoContext> {
    let id_str: String = row.get(0)?;
    Ok(RepoContext {
        id: parse_uuid(0, &id_str)?,
        path: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn optional<T>(result: duckdb::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::Storage(e.to_string())),
    }
}

fn write_active(conn: &duckdb::Connection, context_id: Uuid, checkpoint_id: Uuid) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    // Try update first, then insert
    let affected = conn.execute(
        "UPDATE active_checkpoints SET checkpoint_id = ?, updated_at = ? WHERE context_id = ?",
        duckdb::params![checkpoint_id.to_string(), now, context_id.to_string()],
    )?;
    if affected == 0 {
        conn.execute(
            "INSERT INTO active_checkpoints (context_id, checkpoint_id, updated_at) VALUES (?, ?, ?)",
            duckdb::params![context_id.to_string(), checkpoint_id.to_string(), now],
        )?;
    }
    Ok(())
}

fn insert_checkpoint(conn: &duckdb::Connection, cp: &Checkpoint) -> Result<()> {
    conn.execute(
        "INSERT INTO checkpoints (id, context_id, number, token, label, created_at, parent_id, branch_line) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            cp.id.to_string(),
            cp.context_id.to_string(),
            cp.number,
            cp.token,
            cp.label,
            cp.created_at,
            cp.parent_id.map(|id| id.to_string()),
            cp.branch_line,
        ],
    )?;
    Ok(())
}

fn write_checkpoint(conn: &duckdb::Connection, cp: &Checkpoint) -> Result<()> {
    // context_id and parent_id never change for an existing id
    let affected = conn.execute(
        "UPDATE checkpoints SET number = ?, token = ?, label = ?, created_at = ?, branch_line = ? WHERE id = ?",
        duckdb::params![
            cp.number,
            cp.token,
            cp.label,
            cp.created_at,
            cp.branch_line,
            cp.id.to_string(),
        ],
    )?;
    if affected == 0 {
        insert_checkpoint(conn, cp)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl CheckpointStore for DuckDbStore {
    async fn resolve_context(&self, path: &str) -> Result<RepoContext> {
        let conn = self.conn.lock().await;
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO contexts (id, path, created_at) VALUES (?, ?, ?) ON CONFLICT (path) DO NOTHING",
            duckdb::params![Uuid::now_v7().to_string(), path, now],
        )?;
        let mut stmt = conn.prepare("SELECT id, path, created_at FROM contexts WHERE path = ?")?;
        let context = stmt.query_row(duckdb::params![path], row_to_context)?;
        Ok(context)
    }

    async fn get_active(&self, context_id: Uuid) -> Result<Option<Uuid>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT checkpoint_id FROM active_checkpoints WHERE context_id = ?",
        )?;
        let result = stmt.query_row(duckdb::params![context_id.to_string()], |row| {
            let id_str: String = row.get(0)?;
            parse_uuid(0, &id_str)
        });
        optional(result)
    }

    async fn set_active(&self, context_id: Uuid, checkpoint_id: Uuid) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT context_id FROM checkpoints WHERE id = ?")?;
        let owner = optional(stmt.query_row(duckdb::params![checkpoint_id.to_string()], |row| {
            row.get::<_, String>(0)
        }))?;
        match owner {
            None => {
                return Err(Error::NotFound(format!("checkpoint {checkpoint_id} not found")));
            }
            Some(owner) if owner != context_id.to_string() => {
                return Err(Error::Integrity(format!(
                    "checkpoint {checkpoint_id} belongs to context {owner}, not {context_id}"
                )));
            }
            Some(_) => {}
        }

        write_active(&conn, context_id, checkpoint_id)
    }

    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<()> {
        let conn = self.conn.lock().await;
        write_checkpoint(&conn, cp)
    }

    async fn get_checkpoint(&self, id: Uuid) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints WHERE id = ?"
        ))?;
        optional(stmt.query_row([id.to_string()], row_to_checkpoint))
    }

    async fn get_checkpoint_by_number(&self, context_id: Uuid, number: i64) -> Result<Option<Checkpoint>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints WHERE context_id = ? AND number = ?"
        ))?;
        optional(stmt.query_row(
            duckdb::params![context_id.to_string(), number],
            row_to_checkpoint,
        ))
    }

    async fn list_checkpoints(&self, context_id: Uuid) -> Result<Vec<Checkpoint>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints WHERE context_id = ? ORDER BY number ASC"
        ))?;
        let rows = stmt.query_map(duckdb::params![context_id.to_string()], row_to_checkpoint)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| Error::Storage(e.to_string()))?);
        }
        Ok(results)
    }

    async fn next_number(&self, context_id: Uuid) -> Result<i64> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM checkpoints WHERE context_id = ?",
        )?;
        let next: i64 = stmt.query_row(duckdb::params![context_id.to_string()], |row| row.get(0))?;
        Ok(next)
    }

    async fn count_children(&self, checkpoint_id: Uuid) -> Result<usize> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM checkpoints WHERE parent_id = ?")?;
        let count: i64 = stmt.query_row(duckdb::params![checkpoint_id.to_string()], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn append_checkpoint(&self, cp: &Checkpoint) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        insert_checkpoint(&tx, cp)?;
        write_active(&tx, cp.context_id, cp.id)?;
        tx.commit()?;
        Ok(())
    }

    async fn replace_tree(&self, context_id: Uuid, checkpoints: &[Checkpoint], active: Uuid) -> Result<()> {
        if let Some(stray) = checkpoints.iter().find(|cp| cp.context_id != context_id) {
            return Err(Error::Integrity(format!(
                "checkpoint {} belongs to context {}, not {context_id}",
                stray.id, stray.context_id
            )));
        }
        if !checkpoints.iter().any(|cp| cp.id == active) {
            return Err(Error::Validation(format!(
                "active checkpoint {active} is not part of the new tree"
            )));
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        // The active row is kept and overwritten below; DuckDB rejects
        // re-inserting a deleted key within one transaction
        tx.execute(
            "DELETE FROM checkpoints WHERE context_id = ?",
            duckdb::params![context_id.to_string()],
        )?;
        for cp in checkpoints {
            insert_checkpoint(&tx, cp)?;
        }
        write_active(&tx, context_id, active)?;
        tx.commit()?;
        tracing::debug!(context_id = %context_id, checkpoints = checkpoints.len(), "replaced checkpoint tree");
        Ok(())
    }

    async fn clear_tree(&self, context_id: Uuid) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM active_checkpoints WHERE context_id = ?",
            duckdb::params![context_id.to_string()],
        )?;
        let removed = tx.execute(
            "DELETE FROM checkpoints WHERE context_id = ?",
            duckdb::params![context_id.to_string()],
        )?;
        // Dropping an uncommitted transaction rolls it back
        tx.commit()?;
        tracing::debug!(context_id = %context_id, removed, "cleared checkpoint tree");
        Ok(())
    }
}
