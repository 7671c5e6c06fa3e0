//! SQLite-backed [`Catalog`].
//!
//! Runs one parameterized query per lookup to fetch candidate rows, then
//! filters and ranks them in Rust. Keywords are only ever bound as
//! parameters; the table name comes from validated configuration.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::models::{KeywordPair, ResourceRecord};

use super::{rank_matches, Catalog};

pub struct SqliteCatalog {
    pool: SqlitePool,
    sql: String,
}

impl SqliteCatalog {
    /// `table` must already be validated by [`Config::validate`](crate::config::Config::validate).
    pub fn new(pool: SqlitePool, table: &str) -> Self {
        Self {
            pool,
            sql: lookup_sql(table),
        }
    }
}

/// Candidate query for a two-keyword lookup.
///
/// SQLite's `LOWER` and `LIKE` only fold ASCII, so the patterns are widened
/// (see [`like_pattern`]) and the rows they return are a superset of the real
/// matches. Exact matching, ranking and the limit are applied afterwards with
/// the same Unicode-aware rules as every other backend.
///
/// Placeholder order: kw1 ×3, then kw2 ×3.
fn lookup_sql(table: &str) -> String {
    format!(
        r#"
        SELECT "Nombre_del_Recurso" AS nombre,
               "URL" AS url,
               "Categoría" AS categoria,
               "Descripción" AS descripcion
        FROM {table}
        WHERE LOWER("Nombre_del_Recurso") LIKE ? ESCAPE '\'
           OR LOWER("Categoría") LIKE ? ESCAPE '\'
           OR LOWER("Descripción") LIKE ? ESCAPE '\'
           OR LOWER("Nombre_del_Recurso") LIKE ? ESCAPE '\'
           OR LOWER("Categoría") LIKE ? ESCAPE '\'
           OR LOWER("Descripción") LIKE ? ESCAPE '\'
        ORDER BY "Nombre_del_Recurso"
        "#
    )
}

/// Wrap a keyword as a `%…%` LIKE pattern, escaping LIKE metacharacters.
///
/// Non-ASCII characters become `%`: `LOWER` leaves them unfolded, so `á`
/// must still match a stored `Á`.
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.to_lowercase().chars() {
        if !c.is_ascii() {
            escaped.push('%');
            continue;
        }
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn find_by_keywords(
        &self,
        keywords: &KeywordPair,
        limit: usize,
    ) -> Result<Vec<ResourceRecord>> {
        let kw1 = like_pattern(&keywords.first);
        let kw2 = like_pattern(&keywords.second);

        // Connection is held only for this query and returned to the pool on drop
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query(&self.sql)
            .bind(&kw1)
            .bind(&kw1)
            .bind(&kw1)
            .bind(&kw2)
            .bind(&kw2)
            .bind(&kw2)
            .fetch_all(&mut *conn)
            .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            candidates.push(ResourceRecord {
                name: row.try_get("nombre")?,
                url: row.try_get("url")?,
                category: row.try_get("categoria")?,
                description: row.try_get("descripcion")?,
            });
        }

        Ok(rank_matches(candidates, keywords, limit))
    }
}
