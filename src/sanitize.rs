//! Filler-phrase removal for raw user queries.
//!
//! Users tend to phrase requests as "dame el link para …" or "cuál es el
//! link para …". Those words carry no search value and, left in place, the
//! keyword extractor will happily pick "link" as a keyword. The sanitizer
//! strips them before extraction.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::config::SanitizerConfig;

/// Built-in filler patterns, applied in order.
const FILLER_PATTERNS: &[&str] = &[
    r"\bcu[aá]l(es)?\s+es\s+el\s+link\s+para\b",
    r"\bp[aá]same\s+el\s+link\s+para\b",
    r"\bdame\s+el\s+link\s+para\b",
    r"\blinks?\s+para\b",
];

#[derive(Debug, Clone)]
pub struct PromptSanitizer {
    patterns: Vec<Regex>,
}

impl PromptSanitizer {
    /// Compile the built-in patterns plus any configured extras.
    ///
    /// Fails only when a configured extra pattern is not a valid regex.
    pub fn new(config: &SanitizerConfig) -> Result<Self> {
        let mut patterns = Vec::with_capacity(FILLER_PATTERNS.len() + config.extra_patterns.len());

        for pat in FILLER_PATTERNS
            .iter()
            .copied()
            .chain(config.extra_patterns.iter().map(String::as_str))
        {
            let re = RegexBuilder::new(pat)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("Invalid sanitizer pattern: {}", pat))?;
            patterns.push(re);
        }

        Ok(Self { patterns })
    }

    /// Remove every filler phrase and trim the remainder.
    ///
    /// Never fails; a query made only of filler comes back empty.
    pub fn clean(&self, prompt: &str) -> String {
        let mut cleaned = prompt.to_string();
        for re in &self.patterns {
            cleaned = re.replace_all(&cleaned, "").into_owned();
        }
        cleaned.trim().to_string()
    }
}
