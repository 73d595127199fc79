//! Strategy memory: which strategy last worked for each source.
//!
//! The store is a flat JSON object, `{"source_id": "strategy_name"}`. It is
//! loaded once at startup (a missing or corrupt file just means an empty
//! map), mutated in memory while a run progresses and written back in one
//! piece by [`StrategyMemory::flush`] at the end of the run.
//!
//! There is no locking. The engine processes sources sequentially and the
//! orchestrator owns the store, so there is exactly one writer per run.

use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct StrategyMemory {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl StrategyMemory {
    /// A store that lives only in memory. `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store backed by `path`. Never fails: unreadable or malformed
    /// files are logged and treated as empty.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => parse_entries(&raw).unwrap_or_else(|| {
                warn!("Strategy memory file is malformed; starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No strategy memory file yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(error = %e, "Could not read strategy memory; starting empty");
                BTreeMap::new()
            }
        };
        info!(count = entries.len(), "Loaded strategy memory");
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.entries.get(source_id).map(String::as_str)
    }

    pub fn set(&mut self, source_id: &str, strategy: &str) {
        self.entries
            .insert(source_id.to_string(), strategy.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the whole map, replacing whatever the file held before.
    #[instrument(level = "info", skip_all)]
    pub fn flush(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), count = self.entries.len(), "Strategy memory saved");
        Ok(())
    }
}

/// Accept only a JSON object; non-string values are dropped individually.
fn parse_entries(raw: &str) -> Option<BTreeMap<String, String>> {
    let Value::Object(map) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };
    Some(
        map.into_iter()
            .filter_map(|(source, strategy)| match strategy {
                Value::String(name) => Some((source, name)),
                _ => None,
            })
            .collect(),
    )
}
