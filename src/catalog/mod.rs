//! Resource catalog lookup.
//!
//! The [`Catalog`] trait abstracts the read-only table of curated links so
//! the lookup can run against SQLite ([`sqlite::SqliteCatalog`]) or an
//! in-memory fixture ([`memory::InMemoryCatalog`]).
//!
//! Every backend honours the same contract:
//!
//! - a row matches when its name, category or description contains either
//!   keyword, case-insensitively;
//! - rows whose name contains keyword 1 come first, then rows whose
//!   description contains keyword 1, then everything else, ties broken by
//!   name;
//! - at most `limit` rows come back.
//!
//! [`ResourceLookup`] wraps a backend and turns errors into a
//! [`LookupStatus::Failed`] result; a lookup never propagates an error.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{KeywordPair, ResourceRecord};

/// Maximum number of records returned per lookup.
pub const MAX_RESULTS: usize = 3;

/// Read-only access to the resource catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Find up to `limit` records matching either keyword, best matches first.
    async fn find_by_keywords(
        &self,
        keywords: &KeywordPair,
        limit: usize,
    ) -> Result<Vec<ResourceRecord>>;
}

/// Outcome tag of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupStatus {
    Found(usize),
    NoResults,
    Failed(String),
}

impl LookupStatus {
    /// Machine-readable code, echoed in the response `status` object.
    pub fn code(&self) -> &'static str {
        match self {
            LookupStatus::Found(_) => "found",
            LookupStatus::NoResults => "no_results",
            LookupStatus::Failed(_) => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub records: Vec<ResourceRecord>,
    pub status: LookupStatus,
    /// Human-readable status, used as the answer when synthesis is unavailable.
    pub message: String,
}

impl LookupResult {
    fn found(records: Vec<ResourceRecord>) -> Self {
        let count = records.len();
        Self {
            records,
            status: LookupStatus::Found(count),
            message: found_message(count),
        }
    }

    fn no_results(keywords: &KeywordPair) -> Self {
        Self {
            records: Vec::new(),
            status: LookupStatus::NoResults,
            message: format!(
                "No se encontraron recursos para '{}' ni '{}'.",
                keywords.first, keywords.second
            ),
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            records: Vec::new(),
            status: LookupStatus::Failed(reason),
            message: "Error al consultar la base de datos.".to_string(),
        }
    }
}

/// Status line for a successful lookup of `count` records.
pub fn found_message(count: usize) -> String {
    if count == 1 {
        "Se encontró 1 recurso relacionado.".to_string()
    } else {
        format!("Se encontraron {} recursos relacionados.", count)
    }
}

/// Catalog lookup with error containment.
pub struct ResourceLookup {
    catalog: Arc<dyn Catalog>,
}

impl ResourceLookup {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub async fn lookup(&self, keywords: &KeywordPair) -> LookupResult {
        match self.catalog.find_by_keywords(keywords, MAX_RESULTS).await {
            Ok(mut records) if !records.is_empty() => {
                records.truncate(MAX_RESULTS);
                tracing::info!(
                    kw1 = %keywords.first,
                    kw2 = %keywords.second,
                    count = records.len(),
                    "catalog lookup"
                );
                LookupResult::found(records)
            }
            Ok(_) => {
                tracing::info!(kw1 = %keywords.first, kw2 = %keywords.second, "catalog lookup: no results");
                LookupResult::no_results(keywords)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::error!(error = %reason, "catalog lookup failed");
                LookupResult::failed(reason)
            }
        }
    }
}

/// Keep the records matching either keyword, best first, at most `limit`.
///
/// Stable ordering: rank against keyword 1, then name.
pub(crate) fn rank_matches<I>(records: I, keywords: &KeywordPair, limit: usize) -> Vec<ResourceRecord>
where
    I: IntoIterator<Item = ResourceRecord>,
{
    let mut hits: Vec<(u8, ResourceRecord)> = records
        .into_iter()
        .filter(|r| matches_keyword(r, &keywords.first) || matches_keyword(r, &keywords.second))
        .map(|r| (match_rank(&r, &keywords.first), r))
        .collect();

    hits.sort_by(|(rank_a, a), (rank_b, b)| rank_a.cmp(rank_b).then_with(|| a.name.cmp(&b.name)));
    hits.truncate(limit);
    hits.into_iter().map(|(_, r)| r).collect()
}

fn matches_keyword(record: &ResourceRecord, keyword: &str) -> bool {
    contains_ci(&record.name, keyword)
        || record
            .category
            .as_deref()
            .is_some_and(|c| contains_ci(c, keyword))
        || record
            .description
            .as_deref()
            .is_some_and(|d| contains_ci(d, keyword))
}

/// Match rank of a record against keyword 1: 0 name, 1 description, 2 other.
pub(crate) fn match_rank(record: &ResourceRecord, kw1: &str) -> u8 {
    if contains_ci(&record.name, kw1) {
        0
    } else if record
        .description
        .as_deref()
        .is_some_and(|d| contains_ci(d, kw1))
    {
        1
    } else {
        2
    }
}

/// Case-insensitive substring test.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryCatalog;
    use super::*;

    struct BrokenCatalog;

    #[async_trait]
    impl Catalog for BrokenCatalog {
        async fn find_by_keywords(
            &self,
            _keywords: &KeywordPair,
            _limit: usize,
        ) -> Result<Vec<ResourceRecord>> {
            anyhow::bail!("login timeout expired")
        }
    }

    /// Ignores the limit, to prove the lookup enforces it.
    struct GreedyCatalog;

    #[async_trait]
    impl Catalog for GreedyCatalog {
        async fn find_by_keywords(
            &self,
            _keywords: &KeywordPair,
            _limit: usize,
        ) -> Result<Vec<ResourceRecord>> {
            Ok((0..10)
                .map(|i| ResourceRecord::new(format!("r{}", i), "http://r"))
                .collect())
        }
    }

    fn pair(a: &str, b: &str) -> KeywordPair {
        KeywordPair::from_tokens([a, b]).unwrap()
    }

    #[tokio::test]
    async fn test_failure_becomes_status() {
        let lookup = ResourceLookup::new(Arc::new(BrokenCatalog));
        let result = lookup.lookup(&pair("python", "curso")).await;
        assert!(result.records.is_empty());
        assert!(matches!(result.status, LookupStatus::Failed(ref r) if r.contains("login timeout")));
        assert_eq!(result.status.code(), "error");
        assert_eq!(result.message, "Error al consultar la base de datos.");
    }

    #[tokio::test]
    async fn test_limit_enforced() {
        let lookup = ResourceLookup::new(Arc::new(GreedyCatalog));
        let result = lookup.lookup(&pair("r", "r")).await;
        assert_eq!(result.records.len(), MAX_RESULTS);
        assert_eq!(result.status, LookupStatus::Found(3));
    }

    #[tokio::test]
    async fn test_no_results_message_differs_from_found() {
        let catalog = InMemoryCatalog::new(vec![ResourceRecord::new("Curso Python", "http://x")]);
        let lookup = ResourceLookup::new(Arc::new(catalog));

        let miss = lookup.lookup(&pair("haskell", "ocaml")).await;
        let hit = lookup.lookup(&pair("python", "link")).await;

        assert_eq!(miss.status, LookupStatus::NoResults);
        assert!(miss.records.is_empty());
        assert_eq!(hit.status, LookupStatus::Found(1));
        assert_eq!(hit.message, "Se encontró 1 recurso relacionado.");
        assert_ne!(miss.message, hit.message);
        assert_ne!(miss.status.code(), hit.status.code());
    }

    #[test]
    fn test_found_message_agrees_with_count() {
        assert_eq!(found_message(1), "Se encontró 1 recurso relacionado.");
        assert_eq!(found_message(3), "Se encontraron 3 recursos relacionados.");
    }

    #[test]
    fn test_rank_matches_folds_accents() {
        let records = vec![
            ResourceRecord::new("Otro", "http://o").with_description("ÁLGEBRA"),
            ResourceRecord::new("ÁLGEBRA LINEAL", "http://a"),
            ResourceRecord::new("Sin relación", "http://x"),
        ];
        let ranked = rank_matches(records, &pair("álgebra", "álgebra"), 3);
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ÁLGEBRA LINEAL", "Otro"]);
    }

    #[test]
    fn test_match_rank() {
        let by_name = ResourceRecord::new("Curso Python", "http://a");
        let by_desc = ResourceRecord::new("Curso", "http://b").with_description("Aprende PYTHON");
        let other = ResourceRecord::new("Curso", "http://c").with_category("python");
        assert_eq!(match_rank(&by_name, "python"), 0);
        assert_eq!(match_rank(&by_desc, "python"), 1);
        assert_eq!(match_rank(&other, "python"), 2);
    }
}
