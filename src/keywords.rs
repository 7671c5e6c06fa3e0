//! Keyword extraction with a tiered fallback.
//!
//! The language model is asked for exactly two keywords in the shape
//! `{"keywords": [w1, w2]}`. Its reply is trusted as little as possible:
//!
//! | Tier | Source | Used when |
//! |------|--------|-----------|
//! | 1 | JSON `keywords` array | reply parses and holds ≥ 2 non-empty entries |
//! | 2 | `\w+` tokens of the reply text | reply is not JSON but holds ≥ 2 words |
//! | 3 | whitespace tokens of the cleaned query | the model failed or gave < 2 keywords |
//!
//! A single surviving token is duplicated to fill the pair. The extractor
//! never returns an error.

use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::llm::ChatModel;
use crate::models::{ChatMessage, KeywordPair};

const SYSTEM_PROMPT: &str = "Devuelve exactamente 2 palabras clave relevantes para buscar en SQL, \
en minúsculas y en formato JSON: {\"keywords\": [\"palabra1\", \"palabra2\"]}. \
No añadas ningún otro texto.";

/// Last-resort keyword when neither the model nor the query yields a token.
pub const PLACEHOLDER_KEYWORD: &str = "recurso";

/// Which tier produced the keyword pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    /// Parsed from the model's JSON reply.
    Model,
    /// Word tokens scraped from a non-JSON model reply.
    ModelText,
    /// Tokens of the query itself.
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedKeywords {
    pub pair: KeywordPair,
    pub source: KeywordSource,
}

pub struct KeywordExtractor {
    model: Arc<dyn ChatModel>,
    max_tokens: u32,
    word: Regex,
}

impl KeywordExtractor {
    pub fn new(model: Arc<dyn ChatModel>, max_tokens: u32) -> anyhow::Result<Self> {
        Ok(Self {
            model,
            max_tokens,
            word: Regex::new(r"\w+")?,
        })
    }

    /// Derive a keyword pair from the sanitized query.
    ///
    /// `raw` is the unsanitized query, consulted only when the cleaned one
    /// is empty (the whole input was filler).
    pub async fn extract(&self, cleaned: &str, raw: &str) -> ExtractedKeywords {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Extrae 2 palabras clave en JSON del siguiente texto: {}",
                cleaned
            )),
        ];

        let model_tokens = match self.model.complete(&messages, self.max_tokens).await {
            Ok(reply) => {
                let parsed = self.parse_reply(&reply);
                tracing::debug!(reply = %reply, tokens = ?parsed.0, "keyword model reply");
                Some(parsed)
            }
            Err(e) => {
                tracing::warn!(
                    model = self.model.model_name(),
                    error = %e,
                    "keyword extraction call failed, falling back to query tokens"
                );
                None
            }
        };

        resolve_pair(model_tokens, cleaned, raw)
    }

    /// Parse a model reply into lowercase tokens (at most two) and the tier they came from.
    fn parse_reply(&self, reply: &str) -> (Vec<String>, KeywordSource) {
        match serde_json::from_str::<serde_json::Value>(strip_code_fence(reply)) {
            Ok(json) => {
                let tokens = json
                    .get("keywords")
                    .and_then(|k| k.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str())
                            .map(|s| s.trim().to_lowercase())
                            .filter(|s| !s.is_empty())
                            .take(2)
                            .collect()
                    })
                    .unwrap_or_default();
                (tokens, KeywordSource::Model)
            }
            Err(_) => {
                let tokens = self
                    .word
                    .find_iter(reply)
                    .map(|m| m.as_str().to_lowercase())
                    .take(2)
                    .collect();
                (tokens, KeywordSource::ModelText)
            }
        }
    }
}

fn resolve_pair(
    model_tokens: Option<(Vec<String>, KeywordSource)>,
    cleaned: &str,
    raw: &str,
) -> ExtractedKeywords {
    if let Some((tokens, source)) = &model_tokens {
        if tokens.len() >= 2 {
            if let Some(pair) = KeywordPair::from_tokens(tokens) {
                return ExtractedKeywords {
                    pair,
                    source: *source,
                };
            }
        }
    }

    if let Some(pair) = KeywordPair::from_tokens(cleaned.split_whitespace().take(2)) {
        return ExtractedKeywords {
            pair,
            source: KeywordSource::Query,
        };
    }

    // Cleaned query is empty: keep a lone model keyword before touching the raw text
    if let Some((tokens, source)) = model_tokens {
        if let Some(pair) = KeywordPair::from_tokens(&tokens) {
            return ExtractedKeywords { pair, source };
        }
    }

    let pair = KeywordPair::from_tokens(raw.split_whitespace().take(2)).unwrap_or_else(|| {
        KeywordPair {
            first: PLACEHOLDER_KEYWORD.to_string(),
            second: PLACEHOLDER_KEYWORD.to_string(),
        }
    });

    ExtractedKeywords {
        pair,
        source: KeywordSource::Query,
    }
}

/// Strip a surrounding Markdown code fence (```` ```json … ``` ````), if any.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag on the opening line
    match inner.find('\n') {
        Some(pos) if !inner[..pos].contains('{') => inner[pos + 1..].trim(),
        _ => inner.trim(),
    }
}
