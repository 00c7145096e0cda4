use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_conversations.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_messages.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_message_attachments.sql");

/// Apply the schema in order. Every statement is guarded with IF NOT EXISTS,
/// so re-running at startup is a no-op; any other failure is fatal.
pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for (i, sql) in [MIG_0001, MIG_0002, MIG_0003].into_iter().enumerate() {
        sqlx::raw_sql(sql).execute(db).await?;
        tracing::info!(migration = i + 1, "schema migration applied");
    }
    Ok(())
}
