//! Local catalog schema.
//!
//! The production catalog is owned elsewhere and only ever read by the
//! service. This creates the same table shape in a local SQLite file so the
//! service can be exercised end to end during development and in tests.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_catalog_table(&pool, &config.db.table).await?;
    pool.close().await;
    Ok(())
}

/// `table` must already be validated by [`Config::validate`](crate::config::Config::validate).
pub async fn create_catalog_table(pool: &SqlitePool, table: &str) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            "Nombre_del_Recurso" TEXT NOT NULL,
            "URL" TEXT NOT NULL,
            "Categoría" TEXT,
            "Descripción" TEXT
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"CREATE INDEX IF NOT EXISTS idx_{index}_nombre ON {table}("Nombre_del_Recurso")"#,
        index = table.replace('.', "_"),
    ))
    .execute(pool)
    .await?;

    Ok(())
}
