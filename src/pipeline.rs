//! Request pipeline: sanitize → extract keywords → lookup → synthesize.
//!
//! [`SearchPipeline`] owns one instance of each component, built once from
//! the [`Config`] and shared read-only across requests. Each call to
//! [`SearchPipeline::run`] is independent; the two model calls and the
//! catalog query run strictly one after another.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;

use crate::answer::{Answer, AnswerOutcome, AnswerSynthesizer};
use crate::catalog::{Catalog, LookupStatus, ResourceLookup};
use crate::config::Config;
use crate::keywords::{KeywordExtractor, KeywordSource};
use crate::llm::ChatModel;
use crate::models::{KeywordPair, ResourceRecord};
use crate::sanitize::PromptSanitizer;

/// Answer returned for a missing or blank query.
pub const EMPTY_QUERY_ANSWER: &str = "Consulta vacía.";

/// Per-stage outcome codes, so callers can tell an empty catalog from a
/// failing one without reading the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatus {
    pub keywords: KeywordSource,
    pub lookup: &'static str,
    pub answer: AnswerOutcome,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub answer: String,
    pub records: Vec<ResourceRecord>,
    pub keywords: KeywordPair,
    pub status: StageStatus,
}

pub struct SearchPipeline {
    sanitizer: PromptSanitizer,
    extractor: KeywordExtractor,
    lookup: ResourceLookup,
    synthesizer: AnswerSynthesizer,
}

impl SearchPipeline {
    pub fn new(config: &Config, model: Arc<dyn ChatModel>, catalog: Arc<dyn Catalog>) -> Result<Self> {
        Ok(Self {
            sanitizer: PromptSanitizer::new(&config.sanitizer)?,
            extractor: KeywordExtractor::new(model.clone(), config.llm.keyword_max_tokens)?,
            lookup: ResourceLookup::new(catalog),
            synthesizer: AnswerSynthesizer::new(model, config.llm.answer_max_tokens, &config.answer),
        })
    }

    /// Run the full pipeline for a non-blank query.
    ///
    /// Blank queries are rejected by the caller before reaching here; the
    /// pipeline itself never fails.
    pub async fn run(&self, query: &str) -> SearchOutcome {
        let cleaned = self.sanitizer.clean(query);
        let extracted = self.extractor.extract(&cleaned, query).await;
        tracing::info!(
            cleaned = %cleaned,
            kw1 = %extracted.pair.first,
            kw2 = %extracted.pair.second,
            source = ?extracted.source,
            "keywords extracted"
        );

        let lookup = self.lookup.lookup(&extracted.pair).await;

        // A failed lookup has nothing to summarize; its message is the answer
        let answer = match lookup.status {
            LookupStatus::Failed(_) => Answer::degraded(lookup.message.clone()),
            _ => self.synthesizer.synthesize(query, &lookup).await,
        };

        SearchOutcome {
            answer: answer.text,
            status: StageStatus {
                keywords: extracted.source,
                lookup: lookup.status.code(),
                answer: answer.outcome,
            },
            records: lookup.records,
            keywords: extracted.pair,
        }
    }
}
