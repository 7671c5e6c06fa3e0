//! Core data types that flow through the search pipeline.
//!
//! Everything here is request-scoped: a [`KeywordPair`] parameterizes one
//! catalog lookup, [`ResourceRecord`]s are read from the catalog and echoed
//! back in the response, and nothing outlives the request.

use serde::{Deserialize, Serialize};

/// One row of the resource catalog.
///
/// Serialized with the catalog's own column labels so the response payload
/// matches what downstream consumers already parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(rename = "Nombre")]
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Categoría")]
    pub category: Option<String>,
    #[serde(rename = "Descripción")]
    pub description: Option<String>,
}

impl ResourceRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: None,
            description: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `(label, value)` pairs for prompt rendering, skipping empty columns.
    pub fn labeled_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("Nombre", self.name.as_str()), ("URL", self.url.as_str())];
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            fields.push(("Categoría", category));
        }
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            fields.push(("Descripción", description));
        }
        fields
    }
}

/// Exactly two lowercase, non-empty search keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPair {
    pub first: String,
    pub second: String,
}

impl KeywordPair {
    /// Build a pair from candidate tokens.
    ///
    /// Tokens are trimmed and lowercased; empty ones are dropped. A single
    /// surviving token is duplicated. Returns `None` when nothing survives.
    pub fn from_tokens<I, S>(tokens: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty());

        let first = cleaned.next()?;
        let second = cleaned.next().unwrap_or_else(|| first.clone());
        Some(Self { first, second })
    }

    pub fn as_array(&self) -> [&str; 2] {
        [self.first.as_str(), self.second.as_str()]
    }
}

/// Role of a chat message sent to the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
