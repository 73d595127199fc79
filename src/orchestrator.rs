//! Per-source fetch orchestration.
//!
//! [`Orchestrator::fetch`] walks the strategy chain for one source and stops
//! at the first strategy that yields an article:
//!
//! 1. A disabled source returns nothing, without touching the network.
//! 2. The strategy remembered for the source (if it still applies) runs
//!    first. Success returns immediately and leaves memory as it is.
//! 3. Otherwise the candidate list runs in order, minus the remembered
//!    strategy that just failed. The first winner is written to memory.
//! 4. Exhausting every candidate is a normal, empty outcome.
//!
//! After every failed attempt that is followed by another one, the
//! orchestrator waits a fixed delay. There is no backoff and no jitter, so
//! two runs against the same remote content behave identically.

use crate::memory::StrategyMemory;
use crate::models::{Article, Source};
use crate::strategies::{Strategy, StrategyRunner, candidates};
use std::io;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Articles from one source plus the strategy that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub articles: Vec<Article>,
    pub strategy: Option<String>,
}

/// Walks strategy chains and owns the strategy memory they update.
pub struct Orchestrator<R> {
    runner: R,
    memory: StrategyMemory,
    settings: OrchestratorSettings,
}

impl<R: StrategyRunner> Orchestrator<R> {
    /// `memory` is updated in place; nothing is written to disk until
    /// [`Orchestrator::flush_memory`].
    pub fn new(runner: R, memory: StrategyMemory, settings: OrchestratorSettings) -> Self {
        Self {
            runner,
            memory,
            settings,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Winners recorded so far, including this run's.
    pub fn memory(&self) -> &StrategyMemory {
        &self.memory
    }

    pub fn flush_memory(&self) -> io::Result<()> {
        self.memory.flush()
    }

    /// Fetch up to `limit` articles from `source`. Never fails; an empty
    /// outcome means no strategy produced anything.
    #[instrument(level = "info", skip_all, fields(source = %source.id, limit = limit))]
    pub async fn fetch(&mut self, source: &Source, limit: usize) -> FetchOutcome {
        if !source.enabled {
            info!("Source disabled; skipping");
            return FetchOutcome::default();
        }
        if limit == 0 {
            return FetchOutcome::default();
        }

        let remembered = self.remembered(source);
        let mut failed_before = false;

        if let Some(strategy) = remembered {
            if let Some(articles) = self.attempt(&strategy, source, limit).await {
                return FetchOutcome {
                    articles,
                    strategy: Some(strategy.name()),
                };
            }
            info!(strategy = %strategy.name(), "Remembered strategy failed; walking the full chain");
            failed_before = true;
        }

        for strategy in candidates(source) {
            if Some(strategy) == remembered {
                continue;
            }
            if failed_before {
                sleep(self.settings.retry_delay).await;
            }
            if let Some(articles) = self.attempt(&strategy, source, limit).await {
                let name = strategy.name();
                self.memory.set(&source.id, &name);
                return FetchOutcome {
                    articles,
                    strategy: Some(name),
                };
            }
            failed_before = true;
        }

        warn!("Every strategy came back empty");
        FetchOutcome::default()
    }

    fn remembered(&self, source: &Source) -> Option<Strategy> {
        let name = self.memory.get(&source.id)?;
        let strategy = Strategy::resolve(name, source);
        if strategy.is_none() {
            warn!(strategy = name, "Remembered strategy no longer applies; ignoring it");
        }
        strategy
    }

    /// Run one strategy. `None` means "try the next one".
    async fn attempt(&self, strategy: &Strategy, source: &Source, limit: usize) -> Option<Vec<Article>> {
        let name = strategy.name();
        let t0 = Instant::now();
        info!(strategy = %name, "Trying strategy");

        match self.runner.run(strategy, source, limit).await {
            Ok(mut articles) if !articles.is_empty() => {
                articles.truncate(limit);
                info!(
                    strategy = %name,
                    count = articles.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Strategy succeeded"
                );
                Some(articles)
            }
            Ok(_) => {
                info!(
                    strategy = %name,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Strategy found nothing"
                );
                None
            }
            Err(e) => {
                error!(strategy = %name, error = %e, "Strategy failed");
                None
            }
        }
    }
}
