//! # ragprep CLI (`rp`)
//!
//! One binary drives the whole corpus-preparation pipeline. Every command
//! runs with no arguments against the default directory layout; a
//! `ragprep.toml` (or `--config`) overrides paths, chunking, embedding,
//! and retrieval settings.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rp init` | Create the SQLite index schema (idempotent) |
//! | `rp clean` | Strip wiki chrome from raw HTML and emit markdown |
//! | `rp index` | Chunk and embed markdown into the vector index |
//! | `rp query [QUESTION]` | Retrieve top-k chunks and render a prompt |
//! | `rp pipeline` | Run clean then index |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot: clean raw-html/ and build the index
//! rp pipeline
//!
//! # Inspect what indexing would do
//! rp index --dry-run
//!
//! # Interactive query (prompts on stdin)
//! rp query
//!
//! # Non-interactive query with a wider retrieval window
//! rp query "What is the capital of France?" --top-k 8
//! ```

mod chunk;
mod clean;
mod config;
mod db;
mod embedding;
mod ingest;
mod migrate;
mod models;
mod pipeline;
mod query;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragprep: prepare a wiki document corpus for retrieval-augmented
/// prompting.
#[derive(Parser)]
#[command(
    name = "rp",
    about = "Prepare a wiki document corpus for retrieval-augmented prompting",
    version,
    long_about = "ragprep scrapes wiki-style HTML into markdown, chunks and embeds the \
    markdown into a SQLite vector index, and renders copy-paste prompts from the top-k \
    chunks matching a question. No LLM is called; the output is text."
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file = built-in defaults.
    #[arg(long, global = true, default_value = "./ragprep.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index database schema.
    ///
    /// Creates the SQLite file and all tables (documents, chunks,
    /// embeddings, chunk_vectors). Idempotent.
    Init,

    /// Clean raw HTML into cleaned HTML and markdown.
    ///
    /// Processes every `.html` file in the raw directory independently;
    /// a failing file is reported and skipped, not fatal.
    Clean,

    /// Chunk and embed markdown files into the vector index.
    ///
    /// Re-running over unchanged inputs re-embeds nothing.
    Index {
        /// Show document and chunk counts without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the top-k chunks for a question and render a prompt.
    ///
    /// Without QUESTION, prompts interactively on stdin. The rendered
    /// prompt is printed between copy-paste banner lines.
    Query {
        /// The question to answer.
        question: Option<String>,

        /// Number of chunks to retrieve (default from config).
        #[arg(long)]
        top_k: Option<i64>,
    },

    /// Run the full pipeline: clean, then index.
    Pipeline,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_init(&cfg).await?;
        }
        Commands::Clean => {
            clean::run_clean(&cfg)?;
        }
        Commands::Index { dry_run } => {
            ingest::run_index(&cfg, dry_run).await?;
        }
        Commands::Query { question, top_k } => {
            query::run_query(&cfg, question, top_k).await?;
        }
        Commands::Pipeline => {
            pipeline::run_pipeline(&cfg).await?;
        }
    }

    Ok(())
}
