//! # newsfetch
//!
//! An adaptive news fetch engine. Sources (RSS feeds and HTML listing pages)
//! are fetched through an ordered chain of extraction strategies; the first
//! strategy that yields articles wins and is remembered per source, so the
//! next run tries it first.
//!
//! ## Layers
//!
//! 1. [`coordinator`]: runs every enabled source and aggregates a [`models::RunResult`]
//! 2. [`orchestrator`]: walks the strategy chain for one source
//! 3. [`strategies`]: the strategies themselves, over a shared [`transport`]
//! 4. [`extractor`] and [`language`]: page bodies and translation
//! 5. [`memory`]: which strategy last worked, persisted as JSON
//!
//! [`config`] loads the source catalogue and engine settings, [`outputs`]
//! writes the run snapshot.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod language;
pub mod memory;
pub mod models;
pub mod orchestrator;
pub mod outputs;
pub mod strategies;
pub mod summary;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testing;
