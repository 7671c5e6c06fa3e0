//! In-memory [`Catalog`] for tests and local experiments.
//!
//! Applies the shared matching and ordering rules ([`rank_matches`]) to a
//! plain `Vec`, so pipeline tests can run without a database file.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{KeywordPair, ResourceRecord};

use super::{rank_matches, Catalog};

pub struct InMemoryCatalog {
    records: Vec<ResourceRecord>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn find_by_keywords(
        &self,
        keywords: &KeywordPair,
        limit: usize,
    ) -> Result<Vec<ResourceRecord>> {
        Ok(rank_matches(self.records.iter().cloned(), keywords, limit))
    }
}
