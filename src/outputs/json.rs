//! JSON snapshot of a run.
//!
//! Each run writes one file, `all_sources_<YYYYmmdd_HHMMSS>.json`, holding
//! the per-source reports in configured order plus the aggregate counts.
//! Downstream consumers (summarizers, notifiers) read this file instead of
//! talking to the engine.

use crate::models::RunResult;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// File name for a snapshot taken now.
pub fn snapshot_file_name() -> String {
    format!("all_sources_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write `run` into `output_dir`, creating the directory if needed, and
/// return the path written.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_run(run: &RunResult, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(run)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = Path::new(output_dir).join(snapshot_file_name());
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        sources = run.sources.len(),
        articles = run.total_articles,
        "Wrote run snapshot"
    );
    Ok(path)
}
