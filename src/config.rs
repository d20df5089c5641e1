//! TOML configuration with built-in defaults.
//!
//! Every command runs without any configuration file: a missing file yields
//! the default layout (`raw-html/`, `cleaned-html/`, `cleaned-markdown/`,
//! `rag-index/ragprep.sqlite`). A `ragprep.toml` overrides any subset of
//! the keys.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub db: DbConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of raw `.html` input pages.
    pub raw_html_dir: PathBuf,
    /// Output directory for cleaned `.html` files.
    pub cleaned_html_dir: PathBuf,
    /// Output directory for `.md` files; also the indexer's input.
    pub docs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_html_dir: PathBuf::from("raw-html"),
            cleaned_html_dir: PathBuf::from("cleaned-html"),
            docs_dir: PathBuf::from("cleaned-markdown"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("rag-index/ragprep.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (fastembed) or `"openai"`.
    pub provider: String,
    pub model: Option<String>,
    /// Vector dimensionality. Inferred for known local models; required
    /// for the OpenAI provider.
    pub dims: Option<usize>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            model: Some("all-minilm-l6-v2".to_string()),
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per query.
    pub top_k: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "local" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified for the openai provider");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 for the openai provider");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/ragprep.toml")).unwrap();
        assert_eq!(config.paths.raw_html_dir, PathBuf::from("raw-html"));
        assert_eq!(config.paths.docs_dir, PathBuf::from("cleaned-markdown"));
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.embedding.provider, "local");
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragprep.toml");
        std::fs::write(&path, "[chunking]\nchunk_size = 200\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 200);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.paths.raw_html_dir, PathBuf::from("raw-html"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragprep.toml");
        std::fs::write(&path, "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn top_k_must_be_positive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragprep.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragprep.toml");
        std::fs::write(&path, "[embedding]\nprovider = \"cohere\"\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn openai_provider_requires_dims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragprep.toml");
        std::fs::write(
            &path,
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
        )
        .unwrap();
        assert!(load_config(&path).is_err());
    }
}
