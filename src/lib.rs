//! # ragprep
//!
//! Prepares a wiki-style document corpus for retrieval-augmented prompting.
//!
//! Three batch stages, run in order, communicate only through the
//! filesystem and a persisted SQLite vector index:
//!
//! ```text
//! ┌───────────┐   ┌────────────┐   ┌─────────────┐   ┌───────────┐
//! │ raw HTML  │──▶│  Cleaner    │──▶│  Indexer     │──▶│  SQLite    │
//! │           │   │ strip+text │   │ chunk+embed │   │  vectors   │
//! └───────────┘   └────────────┘   └─────────────┘   └────┬──────┘
//!                                                         │
//!                                                         ▼
//!                                                   ┌───────────┐
//!                                                   │ Query Tool │
//!                                                   │  (prompt)  │
//!                                                   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rp init                      # create the index database
//! rp clean                     # raw-html/ -> cleaned-html/ + cleaned-markdown/
//! rp index                     # chunk + embed markdown into the index
//! rp query "What is a borrow?" # render a copy-paste prompt
//! rp pipeline                  # clean + index in one go
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with zero-config defaults |
//! | [`models`] | Core data types |
//! | [`clean`] | Wiki HTML cleanup and markdown conversion |
//! | [`chunk`] | Overlap-aware text splitting |
//! | [`embedding`] | Embedding providers and vector utilities |
//! | [`ingest`] | Markdown indexing pipeline |
//! | [`query`] | Retrieval and prompt rendering |
//! | [`pipeline`] | clean → index orchestration |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod chunk;
pub mod clean;
pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod query;
