//! Markdown indexing pipeline: discover, chunk, embed, persist.
//!
//! Re-running over unchanged inputs is idempotent: documents are upserted
//! by relative path, a document whose chunks are unchanged keeps its chunk
//! rows (and therefore its embeddings), and only chunks with a missing or
//! stale embedding hash are re-embedded. Embedding failures are fatal to
//! the run.

use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use globset::Glob;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::migrate;
use crate::models::{Chunk, MarkdownDoc};

/// `rp index` entry point.
pub async fn run_index(config: &Config, dry_run: bool) -> Result<()> {
    let docs = scan_markdown(config)?;

    if dry_run {
        let estimated: usize = docs
            .iter()
            .map(|doc| {
                chunk_document(
                    "tmp",
                    &doc.body,
                    config.chunking.chunk_size,
                    config.chunking.chunk_overlap,
                )
                .len()
            })
            .sum();
        println!("index (dry-run)");
        println!("  markdown files: {}", docs.len());
        println!("  estimated chunks: {}", estimated);
        return Ok(());
    }

    let pool = db::connect(&config.db.path).await?;
    migrate::ensure_schema(&pool).await?;
    let provider = embedding::create_provider(&config.embedding)?;

    let mut chunks_written = 0u64;
    let mut docs_unchanged = 0u64;
    for doc in &docs {
        let doc_id = upsert_document(&pool, doc).await?;
        let chunks = chunk_document(
            &doc_id,
            &doc.body,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        );
        if replace_chunks(&pool, &doc_id, &chunks).await? {
            chunks_written += chunks.len() as u64;
        } else {
            docs_unchanged += 1;
        }
    }

    let embedded = embed_pending_chunks(config, &pool, provider.as_ref()).await?;

    println!("index");
    println!("  markdown files: {}", docs.len());
    println!("  unchanged documents: {}", docs_unchanged);
    println!("  chunks written: {}", chunks_written);
    println!("  embeddings computed: {}", embedded);
    println!("✅ Documents embedded and indexed.");

    pool.close().await;
    Ok(())
}

/// Discover `.md` files under the docs directory, sorted by relative path
/// for deterministic runs.
pub fn scan_markdown(config: &Config) -> Result<Vec<MarkdownDoc>> {
    let root = &config.paths.docs_dir;
    if !root.exists() {
        bail!(
            "markdown directory does not exist: {} (run `rp clean` first)",
            root.display()
        );
    }

    let matcher = Glob::new("**/*.md")?.compile_matcher();

    let mut docs = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();
        if !matcher.is_match(&rel_str) {
            continue;
        }

        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        let metadata = std::fs::metadata(path)?;
        let modified_secs = metadata
            .modified()
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        docs.push(MarkdownDoc {
            source_id: rel_str,
            title,
            body,
            modified_at: Utc.timestamp_opt(modified_secs, 0).unwrap(),
        });
    }

    docs.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    Ok(docs)
}

/// Insert or update a document row keyed by its relative path. Returns the
/// stable document id.
pub async fn upsert_document(pool: &SqlitePool, doc: &MarkdownDoc) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(doc.source_id.as_bytes());
    hasher.update(doc.body.as_bytes());
    let dedup_hash = format!("{:x}", hasher.finalize());

    let existing_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM documents WHERE source_id = ?")
            .bind(&doc.source_id)
            .fetch_optional(pool)
            .await?;

    let doc_id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    sqlx::query(
        r#"
        INSERT INTO documents (id, source_id, title, body, created_at, updated_at, dedup_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(source_id) DO UPDATE SET
            title = excluded.title,
            body = excluded.body,
            updated_at = excluded.updated_at,
            dedup_hash = excluded.dedup_hash
        "#,
    )
    .bind(&doc_id)
    .bind(&doc.source_id)
    .bind(&doc.title)
    .bind(&doc.body)
    .bind(doc.modified_at.timestamp())
    .bind(doc.modified_at.timestamp())
    .bind(&dedup_hash)
    .execute(pool)
    .await?;

    Ok(doc_id)
}

/// Replace a document's chunks transactionally. When the stored chunks
/// already match the new ones by (index, hash), nothing is touched so
/// existing embeddings stay valid. Returns whether a write happened.
pub async fn replace_chunks(
    pool: &SqlitePool,
    document_id: &str,
    chunks: &[Chunk],
) -> Result<bool> {
    let existing: Vec<(i64, String)> = sqlx::query(
        "SELECT chunk_index, hash FROM chunks WHERE document_id = ? ORDER BY chunk_index",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| (row.get("chunk_index"), row.get("hash")))
    .collect();

    let unchanged = existing.len() == chunks.len()
        && existing
            .iter()
            .zip(chunks.iter())
            .all(|((idx, hash), chunk)| *idx == chunk.chunk_index && *hash == chunk.hash);
    if unchanged {
        return Ok(false);
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "DELETE FROM embeddings WHERE chunk_id IN (SELECT id FROM chunks WHERE document_id = ?)",
    )
    .bind(document_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut *tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

struct PendingChunk {
    chunk_id: String,
    document_id: String,
    text: String,
    hash: String,
}

/// Embed every chunk with a missing or stale embedding. Any embedding or
/// storage failure aborts the run.
async fn embed_pending_chunks(
    config: &Config,
    pool: &SqlitePool,
    provider: &dyn embedding::EmbeddingProvider,
) -> Result<u64> {
    let model_name = provider.model_name().to_string();

    let rows = sqlx::query(
        r#"
        SELECT c.id AS chunk_id, c.document_id, c.text, c.hash
        FROM chunks c
        LEFT JOIN embeddings e ON e.chunk_id = c.id AND e.model = ?
        WHERE e.chunk_id IS NULL OR e.hash != c.hash
        ORDER BY c.document_id, c.chunk_index
        "#,
    )
    .bind(&model_name)
    .fetch_all(pool)
    .await?;

    let pending: Vec<PendingChunk> = rows
        .iter()
        .map(|row| PendingChunk {
            chunk_id: row.get("chunk_id"),
            document_id: row.get("document_id"),
            text: row.get("text"),
            hash: row.get("hash"),
        })
        .collect();

    let mut embedded = 0u64;
    for batch in pending.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        let vectors = embedding::embed_texts(&config.embedding, &texts)
            .await
            .context("embedding batch failed")?;

        for (item, vec) in batch.iter().zip(vectors.iter()) {
            store_embedding(
                pool,
                &item.chunk_id,
                &item.document_id,
                &model_name,
                provider.dims(),
                &item.hash,
                &embedding::vec_to_blob(vec),
            )
            .await?;
            embedded += 1;
        }
    }

    Ok(embedded)
}

/// Record one chunk's vector and its staleness ledger entry.
pub async fn store_embedding(
    pool: &SqlitePool,
    chunk_id: &str,
    document_id: &str,
    model: &str,
    dims: usize,
    hash: &str,
    blob: &[u8],
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO embeddings (chunk_id, model, dims, created_at, hash)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(chunk_id) DO UPDATE SET
            model = excluded.model,
            dims = excluded.dims,
            created_at = excluded.created_at,
            hash = excluded.hash
        "#,
    )
    .bind(chunk_id)
    .bind(model)
    .bind(dims as i64)
    .bind(now)
    .bind(hash)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO chunk_vectors (chunk_id, document_id, embedding)
        VALUES (?, ?, ?)
        ON CONFLICT(chunk_id) DO UPDATE SET
            document_id = excluded.document_id,
            embedding = excluded.embedding
        "#,
    )
    .bind(chunk_id)
    .bind(document_id)
    .bind(blob)
    .execute(pool)
    .await?;

    Ok(())
}
