//! `newsfetch` binary: load configuration, run every source, write the
//! snapshot.
//!
//! ```sh
//! newsfetch -s config/sources.yaml -c config/newsfetch.yaml -o data
//! ```

use clap::Parser;
use newsfetch::config::{EngineConfig, load_sources};
use newsfetch::coordinator::Coordinator;
use newsfetch::language::GoogleTranslator;
use newsfetch::memory::StrategyMemory;
use newsfetch::models::{RunResult, SourceReport};
use newsfetch::orchestrator::Orchestrator;
use newsfetch::outputs::json;
use newsfetch::strategies::HttpStrategyRunner;
use newsfetch::transport::Transport;
use newsfetch::utils::{ensure_writable_dir, truncate_for_log};
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsfetch starting up");

    let args = Cli::parse();
    debug!(?args.sources, ?args.config, output_dir = %args.output_dir, "Parsed CLI arguments");

    // ---- Configuration, flags win over the file ----
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(limit) = args.limit {
        config.limit_per_source = limit;
    }
    if let Some(memory) = &args.memory {
        config.memory_path = memory.clone();
    }
    if args.proxy.is_some() {
        config.proxy = args.proxy.clone();
    }
    if args.no_translate {
        config.translation.enabled = false;
    }

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let sources = load_sources(&args.sources)?;

    // ---- Engine wiring ----
    let transport = Transport::new(config.transport_settings())?;
    let translator = GoogleTranslator::new(transport.clone(), config.translation.clone());
    let runner = HttpStrategyRunner::new(transport, config.extractor.clone(), translator);
    let memory = StrategyMemory::load(&config.memory_path);
    let orchestrator = Orchestrator::new(runner, memory, config.orchestrator_settings());
    let mut coordinator = Coordinator::new(sources, orchestrator);

    // ---- Single-source test run ----
    if let Some(source_id) = &args.source_id {
        let Some(report) = coordinator.fetch_one(source_id, config.limit_per_source).await else {
            error!(source = %source_id, "Source is not in the catalogue");
            return Err(format!("unknown source `{source_id}`").into());
        };
        print_report(&report);
        if let Some(article) = report.articles.first() {
            println!();
            println!("{}", article.title);
            println!("{}", article.url);
            println!("{}", article.summary);
        }
        if let Err(e) = coordinator.flush_memory() {
            warn!(error = %e, "Could not save strategy memory");
        }
        return Ok(());
    }

    // ---- Full run ----
    let run = coordinator.fetch_all(config.limit_per_source).await;
    print_run(&run);

    if let Err(e) = json::write_run(&run, &args.output_dir).await {
        error!(error = %e, "Failed to write run snapshot");
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "newsfetch finished"
    );
    Ok(())
}

fn print_report(report: &SourceReport) {
    let detail = match (&report.strategy, &report.config_error) {
        (Some(strategy), _) => strategy.clone(),
        (None, Some(reason)) => format!("config error: {}", truncate_for_log(reason, 80)),
        (None, None) => "no strategy succeeded".to_string(),
    };
    println!("{:<24} {:>3} articles  ({detail})", report.source_id, report.articles.len());
}

fn print_run(run: &RunResult) {
    for report in &run.sources {
        print_report(report);
    }
    println!(
        "{} sources attempted, {} succeeded, {} articles",
        run.sources_attempted, run.sources_succeeded, run.total_articles
    );
}
