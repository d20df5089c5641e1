//! Query embedding, nearest-neighbor retrieval, and prompt rendering.
//!
//! The query tool opens the index read-only in spirit: it only ensures the
//! schema exists so that querying an uninitialized index yields an empty
//! prompt body instead of an error.

use std::cmp::Ordering;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::migrate;
use crate::models::RetrievedChunk;

const PROMPT_PREAMBLE: &str =
    "You are an expert. Use the following information to answer the user's question.\n\n";

/// `rp query` entry point. Reads the question from the argument or stdin,
/// retrieves the top-k chunks, and prints the rendered prompt between
/// copy-paste banner lines.
pub async fn run_query(config: &Config, question: Option<String>, top_k: Option<i64>) -> Result<()> {
    let question = match question {
        Some(q) => q,
        None => read_question()?,
    };
    let k = top_k.unwrap_or(config.retrieval.top_k);

    let pool = db::connect(&config.db.path).await?;
    migrate::ensure_schema(&pool).await?;

    let query_vec = embedding::embed_query(&config.embedding, &question).await?;
    let hits = retrieve(&pool, &query_vec, k).await?;
    pool.close().await;

    let prompt = render_prompt(&question, &hits);
    println!();
    println!("📋 Copy this prompt into your LLM chat:");
    println!("======== COPY BELOW ========");
    println!("{}", prompt);
    println!("======== COPY ABOVE ========");
    Ok(())
}

fn read_question() -> Result<String> {
    print!("🔍 Enter your question: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading question from stdin")?;
    Ok(line.trim().to_string())
}

/// Score every stored vector against the query by cosine similarity and
/// return the best `top_k`, highest first. Ties break on chunk id so
/// results are deterministic.
pub async fn retrieve(
    pool: &SqlitePool,
    query_vec: &[f32],
    top_k: i64,
) -> Result<Vec<RetrievedChunk>> {
    let rows = sqlx::query(
        r#"
        SELECT cv.chunk_id, cv.document_id, cv.embedding, c.text, d.source_id
        FROM chunk_vectors cv
        JOIN chunks c ON c.id = cv.chunk_id
        JOIN documents d ON d.id = cv.document_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<RetrievedChunk> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let vec = embedding::blob_to_vec(&blob);
            RetrievedChunk {
                chunk_id: row.get("chunk_id"),
                document_id: row.get("document_id"),
                source_id: row.get("source_id"),
                text: row.get("text"),
                score: embedding::cosine_similarity(query_vec, &vec),
            }
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    hits.truncate(top_k.max(0) as usize);
    Ok(hits)
}

/// Render the copy-paste prompt: preamble, retrieved chunks labeled
/// `[Source N]` in rank order, then the question and an answer cue.
/// Zero hits render a prompt with no Source blocks.
pub fn render_prompt(question: &str, hits: &[RetrievedChunk]) -> String {
    let mut prompt = String::from(PROMPT_PREAMBLE);
    for (i, hit) in hits.iter().enumerate() {
        prompt.push_str(&format!("[Source {}]\n{}\n\n", i + 1, hit.text));
    }
    prompt.push_str(&format!("User's question: {}\n\nAnswer:", question));
    prompt
}
