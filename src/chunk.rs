//! Overlap-aware text splitter.
//!
//! Splits a markdown document into chunks of at most `chunk_size` characters
//! where each chunk shares its first `chunk_overlap` characters with the end
//! of its predecessor. Split points prefer larger semantic boundaries
//! (paragraph, line, sentence, word) before falling back to a raw character
//! cut, so chunks rarely break mid-sentence.
//!
//! Each chunk receives a UUID, a contiguous index starting at 0, and a
//! SHA-256 hash of its text for staleness detection.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Boundary separators, tried largest-first at each split point.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Split `text` and wrap the pieces as [`Chunk`]s with contiguous indices.
pub fn chunk_document(
    document_id: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    split_text(text, chunk_size, chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(document_id, i as i64, &piece))
        .collect()
}

/// Split text into overlapping pieces of at most `chunk_size` bytes.
///
/// Every piece except the last starts `chunk_overlap` bytes before the end
/// of its predecessor (modulo UTF-8 boundary adjustment). Empty or
/// whitespace-only input produces no pieces.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;
    loop {
        let mut end = (start + chunk_size).min(text.len());
        if end < text.len() {
            end = floor_char_boundary(text, end);
            end = find_split(text, start, end);
        }
        pieces.push(text[start..end].to_string());
        if end == text.len() {
            break;
        }

        let mut next = floor_char_boundary(text, end.saturating_sub(chunk_overlap));
        if next <= start {
            // Degenerate overlap/size combination: give up on overlap
            // rather than loop forever.
            next = end;
        }
        start = next;
    }
    pieces
}

/// Pick a split point in `text[start..end]`, preferring the largest
/// separator found in the latter half of the window so pieces stay near
/// full size. Falls back to a raw cut at `end`.
fn find_split(text: &str, start: usize, end: usize) -> usize {
    let window = &text[start..end];
    let min_len = window.len() / 2;
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            let cut = pos + sep.len();
            if cut > min_len {
                return start + cut;
            }
        }
    }
    end
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
