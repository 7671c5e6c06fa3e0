//! TOML configuration with environment overrides.
//!
//! The configuration is read once at startup and passed by reference into
//! every component constructor. Nothing reads the environment after
//! [`load_config`] returns, except the language-model credential which is
//! only ever taken from `AZURE_OPENAI_API_KEY`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Catalog table. Interpolated into SQL, so it is validated as an identifier.
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            table: default_table(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_url() -> String {
    "sqlite:./data/catalog.sqlite".to_string()
}
fn default_table() -> String {
    "LinksBusqueda".to_string()
}
fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_deployment")]
    pub deployment: String,
    #[serde(default = "default_keyword_max_tokens")]
    pub keyword_max_tokens: u32,
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            deployment: default_deployment(),
            keyword_max_tokens: default_keyword_max_tokens(),
            answer_max_tokens: default_answer_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://example.openai.azure.com/".to_string()
}
fn default_api_version() -> String {
    "2023-05-15".to_string()
}
fn default_deployment() -> String {
    "gpt-4o-mini".to_string()
}
fn default_keyword_max_tokens() -> u32 {
    20
}
fn default_answer_max_tokens() -> u32 {
    300
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    /// Pick the single-link template when the query asks for one link.
    /// When `false`, every non-empty result uses the list template.
    #[serde(default = "default_detect_single_link")]
    pub detect_single_link: bool,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            detect_single_link: default_detect_single_link(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_detect_single_link() -> bool {
    true
}
fn default_max_context_chars() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SanitizerConfig {
    /// Additional filler regexes, applied case-insensitively after the built-in ones.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5002".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig::default(),
            llm: LlmConfig::default(),
            answer: AnswerConfig::default(),
            sanitizer: SanitizerConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Apply environment overrides from any key/value source.
    ///
    /// Split out from [`load_config`] so tests can feed a map instead of
    /// mutating the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *target = value;
            }
        };

        set(&mut self.db.url, "CATALOG_DATABASE_URL");
        set(&mut self.db.table, "CATALOG_TABLE");
        set(&mut self.llm.api_base, "AZURE_OPENAI_API_BASE");
        set(&mut self.llm.api_version, "AZURE_OPENAI_API_VERSION");
        set(&mut self.llm.deployment, "AZURE_OPENAI_DEPLOYMENT");
        set(&mut self.server.bind, "SERVER_BIND");
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_table_name(&self.db.table) {
            anyhow::bail!(
                "db.table must be a plain identifier such as 'LinksBusqueda' (no schema prefix), got '{}'",
                self.db.table
            );
        }

        if self.db.max_connections == 0 {
            anyhow::bail!("db.max_connections must be >= 1");
        }

        if self.llm.keyword_max_tokens == 0 || self.llm.answer_max_tokens == 0 {
            anyhow::bail!("llm.keyword_max_tokens and llm.answer_max_tokens must be > 0");
        }

        if self.llm.api_base.trim().is_empty() || self.llm.deployment.trim().is_empty() {
            anyhow::bail!("llm.api_base and llm.deployment must not be empty");
        }

        if self.answer.max_context_chars == 0 {
            anyhow::bail!("answer.max_context_chars must be > 0");
        }

        Ok(())
    }
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`. Schema-qualified names such as
/// `dbo.Table` are rejected: SQLite reads the prefix as an attached database.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Load configuration from `path`, then apply environment overrides.
///
/// A missing file is not an error: the built-in defaults are used instead,
/// so the service can run from environment variables alone.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}
