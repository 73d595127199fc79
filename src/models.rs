//! Data models shared by every layer of the engine.
//!
//! - [`Source`]: one configured news origin, already validated
//! - [`SourceEntry`]: a catalogue slot, either a valid source or a config error
//! - [`Article`]: the normalized record handed to downstream consumers
//! - [`RunResult`]: everything one coordinator run produced

use crate::strategies::sites::SiteProfile;
use crate::summary::derive_summary;
use chrono::Local;
use serde::{Deserialize, Serialize};
use url::Url;

/// Article bodies are capped at this many characters.
pub const MAX_BODY_CHARS: usize = 2000;

/// How a source publishes its articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// One or more RSS/Atom locators, tried in configured order.
    Feed { locators: Vec<Url> },
    /// An HTML listing page whose anchors point at articles.
    Scrape(ScrapeConfig),
}

/// Listing-page configuration for scrape sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// Page that lists the latest articles.
    pub listing_url: Url,
    /// Base for resolving relative links. Defaults to `listing_url`.
    pub base_url: Option<Url>,
    /// CSS selectors narrowing the listing to the article area.
    pub selector_hints: Vec<String>,
}

impl ScrapeConfig {
    pub fn link_base(&self) -> &Url {
        self.base_url.as_ref().unwrap_or(&self.listing_url)
    }
}

/// A validated news source. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub enabled: bool,
    pub kind: SourceKind,
    /// Front page of the site, used by the generic and homepage-based strategies.
    pub homepage: Option<Url>,
    /// Site-specific strategies, resolved from the override table at load time.
    pub site_profiles: Vec<&'static SiteProfile>,
}

impl Source {
    pub fn feed_locators(&self) -> &[Url] {
        match &self.kind {
            SourceKind::Feed { locators } => locators,
            SourceKind::Scrape(_) => &[],
        }
    }

    pub fn scrape_config(&self) -> Option<&ScrapeConfig> {
        match &self.kind {
            SourceKind::Scrape(config) => Some(config),
            SourceKind::Feed { .. } => None,
        }
    }

    /// Page the generic strategy starts from: the homepage, else the listing
    /// page, else the origin of the first feed locator.
    pub fn landing_page(&self) -> Option<Url> {
        if let Some(homepage) = &self.homepage {
            return Some(homepage.clone());
        }
        match &self.kind {
            SourceKind::Scrape(config) => Some(config.listing_url.clone()),
            SourceKind::Feed { locators } => locators
                .first()
                .and_then(|locator| Url::parse(&locator.origin().ascii_serialization()).ok()),
        }
    }
}

/// One slot of the source catalogue.
///
/// Invalid entries are kept so the coordinator can report them with an empty
/// article list instead of silently dropping them.
#[derive(Debug, Clone)]
pub enum SourceEntry {
    Valid(Source),
    Invalid {
        id: String,
        enabled: bool,
        reason: String,
    },
}

impl SourceEntry {
    pub fn id(&self) -> &str {
        match self {
            SourceEntry::Valid(source) => &source.id,
            SourceEntry::Invalid { id, .. } => id,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            SourceEntry::Valid(source) => source.enabled,
            SourceEntry::Invalid { enabled, .. } => *enabled,
        }
    }
}

/// A normalized news article.
///
/// Constructed only through [`Article::new`], which enforces the invariants
/// consumers rely on: non-empty title and URL, body capped at
/// [`MAX_BODY_CHARS`] characters, summary always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub body: String,
    pub summary: String,
    pub source: String,
    /// RFC 3339 local timestamp of when the article was fetched.
    pub fetched_at: String,
}

impl Article {
    /// Returns `None` when title or URL is blank. An empty body is replaced
    /// by the title.
    pub fn new(source: &str, title: &str, url: &str, body: &str) -> Option<Article> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() || url.is_empty() {
            return None;
        }

        let body = match body.trim() {
            "" => title,
            text => text,
        };
        let body: String = body.chars().take(MAX_BODY_CHARS).collect();
        let summary = derive_summary(title, &body);

        Some(Article {
            title: title.to_string(),
            url: url.to_string(),
            body,
            summary,
            source: source.to_string(),
            fetched_at: Local::now().to_rfc3339(),
        })
    }
}

/// What one source produced during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    pub articles: Vec<Article>,
    /// Name of the strategy that produced `articles`, if any did.
    pub strategy: Option<String>,
    /// Set when the source was skipped because its configuration is invalid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,
}

/// The outcome of one coordinator run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    /// One report per enabled source, in configured order.
    pub sources: Vec<SourceReport>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub total_articles: usize,
}

impl RunResult {
    pub(crate) fn record(&mut self, report: SourceReport) {
        self.sources_attempted += 1;
        if !report.articles.is_empty() {
            self.sources_succeeded += 1;
        }
        self.total_articles += report.articles.len();
        self.sources.push(report);
    }

    /// Articles for `source_id`. `None` means the source was not part of the
    /// run; `Some(&[])` means it ran and found nothing.
    pub fn articles_for(&self, source_id: &str) -> Option<&[Article]> {
        self.sources
            .iter()
            .find(|report| report.source_id == source_id)
            .map(|report| report.articles.as_slice())
    }

    pub fn strategy_for(&self, source_id: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|report| report.source_id == source_id)
            .and_then(|report| report.strategy.as_deref())
    }
}
