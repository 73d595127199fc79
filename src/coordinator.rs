//! Multi-source runs.
//!
//! The coordinator walks the source catalogue in configured order, hands
//! every enabled source to the orchestrator and aggregates the outcome into
//! a [`RunResult`]. Nothing here fails: configuration problems and empty
//! sources are recorded in the result, and a failing memory flush is logged.

use crate::models::{RunResult, SourceEntry, SourceReport};
use crate::orchestrator::Orchestrator;
use crate::strategies::StrategyRunner;
use std::io;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Owns the source catalogue and the orchestrator that fetches from it.
pub struct Coordinator<R> {
    sources: Vec<SourceEntry>,
    orchestrator: Orchestrator<R>,
}

impl<R: StrategyRunner> Coordinator<R> {
    /// `sources` keeps its configured order; invalid entries stay in it so
    /// runs can report them.
    pub fn new(sources: Vec<SourceEntry>, orchestrator: Orchestrator<R>) -> Self {
        Self {
            sources,
            orchestrator,
        }
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    pub fn orchestrator(&self) -> &Orchestrator<R> {
        &self.orchestrator
    }

    /// Persist what the orchestrator has learned so far.
    pub fn flush_memory(&self) -> io::Result<()> {
        self.orchestrator.flush_memory()
    }

    /// Fetch every enabled source, then persist strategy memory once.
    #[instrument(level = "info", skip_all, fields(limit = limit))]
    pub async fn fetch_all(&mut self, limit: usize) -> RunResult {
        let t0 = Instant::now();
        let mut run = RunResult::default();

        for entry in self.sources.iter().filter(|entry| entry.enabled()) {
            let report = fetch_entry(&mut self.orchestrator, entry, limit).await;
            run.record(report);
        }

        if let Err(e) = self.orchestrator.flush_memory() {
            error!(error = %e, "Could not save strategy memory");
        }

        info!(
            attempted = run.sources_attempted,
            succeeded = run.sources_succeeded,
            total = run.total_articles,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Run complete"
        );
        run
    }

    /// Fetch a single source by id. `None` when the id is not in the
    /// catalogue. A disabled source is still reported, but nothing is fetched
    /// for it. Memory is not flushed; callers decide whether a test run
    /// should persist what it learned.
    pub async fn fetch_one(&mut self, source_id: &str, limit: usize) -> Option<SourceReport> {
        let Some(entry) = self.sources.iter().find(|entry| entry.id() == source_id) else {
            warn!(source = source_id, "No such source");
            return None;
        };
        if !entry.enabled() {
            warn!(source = source_id, "Source is disabled; set `enabled: true` to fetch it");
        }
        Some(fetch_entry(&mut self.orchestrator, entry, limit).await)
    }
}

async fn fetch_entry<R: StrategyRunner>(
    orchestrator: &mut Orchestrator<R>,
    entry: &SourceEntry,
    limit: usize,
) -> SourceReport {
    match entry {
        SourceEntry::Valid(source) => {
            let outcome = orchestrator.fetch(source, limit).await;
            info!(source = %source.id, count = outcome.articles.len(), strategy = ?outcome.strategy, "Source done");
            SourceReport {
                source_id: source.id.clone(),
                articles: outcome.articles,
                strategy: outcome.strategy,
                config_error: None,
            }
        }
        SourceEntry::Invalid { id, reason, .. } => {
            warn!(source = %id, reason = %reason, "Skipping misconfigured source");
            SourceReport {
                source_id: id.clone(),
                articles: Vec::new(),
                strategy: None,
                config_error: Some(reason.clone()),
            }
        }
    }
}
