//! Core data types flowing through the pipeline.

use chrono::{DateTime, Utc};

/// Markdown document discovered under the docs directory.
#[derive(Debug, Clone)]
pub struct MarkdownDoc {
    /// Path relative to the docs directory; stable identity across runs.
    pub source_id: String,
    pub title: String,
    pub body: String,
    pub modified_at: DateTime<Utc>,
}

/// A chunk of a document's body text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, used for embedding staleness detection.
    pub hash: String,
}

/// A chunk returned from nearest-neighbor retrieval, best first.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source_id: String,
    pub text: String,
    pub score: f32,
}
