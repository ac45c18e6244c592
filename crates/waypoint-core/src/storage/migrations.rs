pub const CREATE_CONTEXTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS contexts (
    id VARCHAR PRIMARY KEY,
    path VARCHAR NOT NULL UNIQUE,
    created_at VARCHAR NOT NULL
);
";

pub const CREATE_CHECKPOINTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    id VARCHAR PRIMARY KEY,
    context_id VARCHAR NOT NULL,
    number BIGINT NOT NULL,
    token VARCHAR NOT NULL,
    label VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    parent_id VARCHAR,
    branch_line VARCHAR NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_context ON checkpoints(context_id);
CREATE INDEX IF NOT EXISTS idx_checkpoints_parent ON checkpoints(parent_id);
";

// One row per context at most. Rows are replaced, never accumulated.
pub const CREATE_ACTIVE_CHECKPOINTS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS active_checkpoints (
    context_id VARCHAR PRIMARY KEY,
    checkpoint_id VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL
);
";

pub fn run_migrations(conn: &duckdb::Connection) -> duckdb::Result<()> {
    conn.execute_batch(CREATE_CONTEXTS_TABLE)?;
    conn.execute_batch(CREATE_CHECKPOINTS_TABLE)?;
    conn.execute_batch(CREATE_ACTIVE_CHECKPOINTS_TABLE)?;
    Ok(())
}
