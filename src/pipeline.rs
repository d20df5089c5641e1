//! Explicit orchestration of the clean → index sequence.
//!
//! The stages only communicate through the filesystem, so running them out
//! of order silently indexes stale markdown. `rp pipeline` encodes the
//! correct order in one command; `clean` and `index` stay individually
//! invocable for operators who sequence by hand.

use anyhow::Result;

use crate::clean;
use crate::config::Config;
use crate::ingest;

pub async fn run_pipeline(config: &Config) -> Result<()> {
    clean::run_clean(config)?;
    ingest::run_index(config, false).await?;
    Ok(())
}
