//! The strategy set.
//!
//! A [`Strategy`] is a stateless value naming one way of getting articles out
//! of a source. [`candidates`] builds the ordered list the orchestrator walks
//! for a source, and a [`StrategyRunner`] executes one strategy against one
//! source. The production runner, [`HttpStrategyRunner`], is split across
//! the submodules by the shape of what it fetches:
//!
//! - `feed`: RSS/Atom strategies
//! - `scrape`: listing-page strategies and the generic last resort
//! - `sites`: declarative site profiles
//!
//! Every strategy hands its link candidates to the same assembly step, so
//! content sourcing (teaser, then page body, then title), translation and
//! summary derivation behave identically regardless of where a link came
//! from.

pub mod feed;
pub mod scrape;
pub mod sites;

use crate::error::{FetchError, Result};
use crate::extractor::{ContentExtractor, ExtractorConfig};
use crate::language::{self, GoogleTranslator, Translator};
use crate::models::{Article, Source, SourceKind};
use crate::transport::Transport;
use crate::utils::{char_len, strip_tags, truncate_for_log};
use futures::{StreamExt, future, stream};
use sites::SiteProfile;
use tracing::debug;
use url::Url;

/// Upper bound on strategies tried for one source in one fetch.
pub const MAX_CANDIDATES: usize = 7;
/// Feed locators that get an alternate-identity attempt of their own.
pub const MAX_ALT_IDENTITY_LOCATORS: usize = 2;
/// Teasers and page bodies shorter than this are not worth keeping.
pub const MIN_USEFUL_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Site(&'static SiteProfile),
    FeedStructured,
    FeedRaw,
    /// Zero-based index into the source's feed locators.
    FeedAltIdentity { locator: usize },
    ScrapeStructured,
    ScrapeRaw,
    Generic,
}

impl Strategy {
    /// Stable name, used as the strategy memory value.
    pub fn name(&self) -> String {
        match self {
            Strategy::Site(profile) => format!("site:{}", profile.name),
            Strategy::FeedStructured => "feed_structured".to_string(),
            Strategy::FeedRaw => "feed_raw".to_string(),
            Strategy::FeedAltIdentity { locator } => format!("feed_alt_identity_{}", locator + 1),
            Strategy::ScrapeStructured => "scrape_structured".to_string(),
            Strategy::ScrapeRaw => "scrape_raw".to_string(),
            Strategy::Generic => "generic".to_string(),
        }
    }

    /// Find the strategy called `name` among the ones applicable to `source`.
    pub fn resolve(name: &str, source: &Source) -> Option<Strategy> {
        candidates(source).into_iter().find(|strategy| strategy.name() == name)
    }
}

/// Ordered strategies for `source`: site overrides, then the generic
/// strategies of its kind, then the universal fallback.
pub fn candidates(source: &Source) -> Vec<Strategy> {
    let mut list: Vec<Strategy> = source.site_profiles.iter().copied().map(Strategy::Site).collect();

    match &source.kind {
        SourceKind::Feed { locators } => {
            list.push(Strategy::FeedStructured);
            list.push(Strategy::FeedRaw);
            list.extend(
                (0..locators.len().min(MAX_ALT_IDENTITY_LOCATORS))
                    .map(|locator| Strategy::FeedAltIdentity { locator }),
            );
        }
        SourceKind::Scrape(_) => {
            list.push(Strategy::ScrapeStructured);
            list.push(Strategy::ScrapeRaw);
        }
    }

    list.push(Strategy::Generic);
    list.truncate(MAX_CANDIDATES);
    list
}

/// Executes a single strategy against a single source.
///
/// `Ok(vec![])` is the normal "nothing here" outcome. `Err` is reserved for
/// contract violations, such as a feed strategy handed a source without
/// feed locators.
pub trait StrategyRunner {
    async fn run(&self, strategy: &Strategy, source: &Source, limit: usize) -> Result<Vec<Article>>;
}

/// A link found by a strategy, before any content is fetched for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub url: Url,
    /// Feed description or listing teaser, possibly containing markup.
    pub teaser: Option<String>,
}

/// The network-backed runner.
#[derive(Debug, Clone)]
pub struct HttpStrategyRunner<T: Translator = GoogleTranslator> {
    transport: Transport,
    extractor: ContentExtractor,
    translator: T,
}

impl<T: Translator> HttpStrategyRunner<T> {
    pub fn new(transport: Transport, extractor: ExtractorConfig, translator: T) -> Self {
        let extractor = ContentExtractor::new(transport.clone(), extractor);
        Self {
            transport,
            extractor,
            translator,
        }
    }

    /// Turn candidates into articles one at a time, stopping as soon as
    /// `limit` articles exist. Later candidates are never fetched.
    pub(crate) async fn collect(&self, source_id: &str, candidates: Vec<Candidate>, limit: usize) -> Vec<Article> {
        stream::iter(candidates)
            .then(|candidate| self.assemble(source_id, candidate))
            .filter_map(future::ready)
            .take(limit)
            .collect()
            .await
    }

    async fn assemble(&self, source_id: &str, candidate: Candidate) -> Option<Article> {
        if candidate.title.trim().is_empty() {
            return None;
        }

        let teaser = candidate.teaser.as_deref().map(strip_tags).unwrap_or_default();
        let content = if char_len(&teaser) >= MIN_USEFUL_CHARS {
            teaser
        } else {
            let body = self.extractor.extract_body(candidate.url.as_str()).await;
            if char_len(&body) >= MIN_USEFUL_CHARS {
                body
            } else {
                debug!(url = %candidate.url, "No usable content; using title as body");
                candidate.title.clone()
            }
        };

        let (title, content) = language::normalize(&self.translator, candidate.title, content).await;
        let article = Article::new(source_id, &title, candidate.url.as_str(), &content);
        if let Some(article) = &article {
            debug!(title = %truncate_for_log(&article.title, 60), "Assembled article");
        }
        article
    }
}

impl<T: Translator> StrategyRunner for HttpStrategyRunner<T> {
    async fn run(&self, strategy: &Strategy, source: &Source, limit: usize) -> Result<Vec<Article>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        match strategy {
            Strategy::Site(profile) => self.run_site(profile, source, limit).await,
            Strategy::FeedStructured => self.run_feed_structured(source, limit).await,
            Strategy::FeedRaw => self.run_feed_raw(source, limit).await,
            Strategy::FeedAltIdentity { locator } => {
                let Some(url) = source.feed_locators().get(*locator) else {
                    return Err(FetchError::Contract(format!(
                        "`{}` has no feed locator #{}",
                        source.id,
                        locator + 1
                    )));
                };
                self.run_feed_alt_identity(url, source, limit).await
            }
            Strategy::ScrapeStructured => self.run_scrape_structured(source, limit).await,
            Strategy::ScrapeRaw => self.run_scrape_raw(source, limit).await,
            Strategy::Generic => self.run_generic(source, limit).await,
        }
    }
}
