//! # Link Search
//!
//! Answers free-text questions about a curated catalog of resource links.
//!
//! Each request goes through a fixed, linear pipeline:
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐
//! │ Sanitizer │──▶│ Keywords  │──▶│  Lookup  │──▶│  Answer    │
//! │ (regex)   │   │ (LLM #1)  │   │  (SQL)   │   │  (LLM #2)  │
//! └───────────┘   └───────────┘   └──────────┘   └────────────┘
//! ```
//!
//! Every stage degrades instead of failing: keyword extraction falls back to
//! query tokens, a failed lookup becomes an error status, and a failed
//! synthesis returns the lookup's status message.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`models`] | Core data types |
//! | [`sanitize`] | Filler-phrase removal |
//! | [`llm`] | Chat-completion client abstraction |
//! | [`keywords`] | Keyword extraction with tiered fallback |
//! | [`catalog`] | Catalog trait, SQLite and in-memory backends |
//! | [`answer`] | Answer synthesis |
//! | [`pipeline`] | Stage sequencing |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Local catalog schema |

pub mod answer;
pub mod catalog;
pub mod config;
pub mod db;
pub mod keywords;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod sanitize;
pub mod server;
