//! # Link Search CLI (`linksearch`)
//!
//! ## Usage
//!
//! ```bash
//! linksearch --config ./config/search.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `linksearch init` | Create the catalog table in a local SQLite database |
//! | `linksearch ask "<query>"` | Run the pipeline once and print the JSON response |
//! | `linksearch serve` | Start the HTTP server |
//!
//! The language-model credential is always read from `AZURE_OPENAI_API_KEY`.
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use link_search::catalog::sqlite::SqliteCatalog;
use link_search::config;
use link_search::db;
use link_search::llm::AzureChatClient;
use link_search::migrate;
use link_search::pipeline::SearchPipeline;
use link_search::server;

/// Link Search: answers questions about a curated catalog of resource links.
#[derive(Parser)]
#[command(name = "linksearch", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional: when the file does not exist, built-in defaults plus
    /// environment overrides are used.
    #[arg(long, global = true, default_value = "./config/search.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog table in a local SQLite database.
    ///
    /// Idempotent. Only meant for development; the production catalog is
    /// managed outside this service.
    Init,

    /// Run the search pipeline once and print the response as JSON.
    Ask {
        /// The free-text query.
        query: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Catalog table '{}' ready.", cfg.db.table);
        }
        Commands::Ask { query } => {
            if query.trim().is_empty() {
                anyhow::bail!("query must not be empty");
            }
            let pool = db::connect(&cfg).await?;
            let catalog = Arc::new(SqliteCatalog::new(pool.clone(), &cfg.db.table));
            let model = Arc::new(AzureChatClient::from_env(&cfg.llm)?);
            let pipeline = SearchPipeline::new(&cfg, model, catalog)?;

            let outcome = pipeline.run(&query).await;
            let body = serde_json::json!({
                "answer": outcome.answer,
                "results": outcome.records,
                "status": outcome.status,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            pool.close().await;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
