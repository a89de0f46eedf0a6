use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_conversations.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_messages.sql");

pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    // Run sequentially; each file may contain multiple statements and every
    // statement is IF NOT EXISTS, so reruns are harmless.
    for (i, sql) in [MIG_0001, MIG_0002].into_iter().enumerate() {
        let label = i + 1;
        sqlx::raw_sql(sql).execute(db).await?;
        tracing::info!(migration = %label, "migration applied");
    }
    Ok(())
}
