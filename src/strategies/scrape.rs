//! Listing-page strategies: structured scrape, raw scrape and the generic
//! last resort.
//!
//! All three read anchors off an HTML page, keep the ones whose text looks
//! like a headline, resolve them to absolute links and hand them to the
//! shared article assembly. They differ in which anchors they look at:
//!
//! - **structured**: anchors inside the configured selector hints (or the
//!   whole page), browser identity, links resolved against `base_url`
//! - **raw**: only the first `limit` anchors of the page, minimal identity
//! - **generic**: anchors matching well-known article URL patterns on the
//!   source's landing page, first pattern that produces articles wins

use super::{Candidate, HttpStrategyRunner};
use crate::error::{FetchError, Result};
use crate::language::Translator;
use crate::models::{Article, Source};
use crate::transport::{BROWSER_UA, HTML_ACCEPT, MINIMAL_UA, RequestProfile};
use crate::utils::{char_len, collapse_whitespace, resolve_link};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Listing anchors need more than this many characters of text.
pub const MIN_HEADLINE_CHARS: usize = 10;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Article URL patterns tried by the generic strategy, in order.
pub const GENERIC_SELECTORS: &[&str] = &[
    "a[href*=\"/doc-\"]",
    "a[href*=\"/roll/\"]",
    "a[href*=\"/news/\"]",
    "a[href*=\"/article/\"]",
    ".news-item a",
    "article a",
    ".post-title a",
];

/// Filters applied to every listing link.
#[derive(Debug, Clone, Copy)]
pub struct LinkRules<'a> {
    pub min_title_chars: usize,
    pub href_excludes: &'a [&'a str],
}

impl Default for LinkRules<'_> {
    fn default() -> Self {
        Self {
            min_title_chars: MIN_HEADLINE_CHARS,
            href_excludes: &[],
        }
    }
}

/// The anchor an item element stands for: the element itself when it is a
/// link, otherwise the first link inside it.
fn anchor_of(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if element.value().name() == "a" && element.value().attr("href").is_some() {
        return Some(element);
    }
    element.select(&ANCHOR).next()
}

/// Turn item elements into deduplicated candidates.
pub fn extract_links<'a>(
    items: impl Iterator<Item = ElementRef<'a>>,
    base: &Url,
    rules: &LinkRules<'_>,
    teaser: Option<&Selector>,
) -> Vec<Candidate> {
    items
        .filter_map(|item| {
            let anchor = anchor_of(item)?;
            let href = anchor.value().attr("href")?;
            let title = collapse_whitespace(&anchor.text().collect::<String>());
            if char_len(&title) <= rules.min_title_chars {
                debug!(%title, "Dropping short listing title");
                return None;
            }
            if rules.href_excludes.iter().any(|pattern| href.contains(pattern)) {
                return None;
            }
            let url = resolve_link(base, href)?;
            let teaser = teaser
                .and_then(|selector| item.select(selector).next())
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|text| !text.is_empty());
            Some(Candidate { title, url, teaser })
        })
        .unique_by(|candidate| candidate.url.clone())
        .collect()
}

/// Candidates from a listing page, optionally scoped by selector hints.
///
/// `max_anchors` limits how many anchors are inspected at all, before any
/// filtering.
pub fn listing_candidates(
    html: &str,
    base: &Url,
    hints: &[String],
    max_anchors: Option<usize>,
) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let scopes: Vec<Selector> = hints
        .iter()
        .filter_map(|hint| Selector::parse(hint).ok())
        .collect();

    let items: Vec<ElementRef> = if scopes.is_empty() {
        document.select(&ANCHOR).collect()
    } else {
        scopes
            .iter()
            .flat_map(|scope| document.select(scope))
            .flat_map(|scoped| {
                if scoped.value().name() == "a" {
                    vec![scoped]
                } else {
                    scoped.select(&ANCHOR).collect()
                }
            })
            .collect()
    };

    let cap = max_anchors.unwrap_or(items.len());
    extract_links(items.into_iter().take(cap), base, &LinkRules::default(), None)
}

/// Candidates for one generic URL pattern; only the first `limit` matches
/// are inspected.
pub fn generic_candidates(html: &str, base: &Url, pattern: &Selector, limit: usize) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    extract_links(
        document.select(pattern).take(limit),
        base,
        &LinkRules::default(),
        None,
    )
}

impl<T: Translator> HttpStrategyRunner<T> {
    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub(super) async fn run_scrape_structured(&self, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let config = source
            .scrape_config()
            .ok_or_else(|| FetchError::Contract(format!("`{}` has no scrape configuration", source.id)))?;
        let profile = RequestProfile::new(BROWSER_UA, self.transport.settings().page_timeout).accept(HTML_ACCEPT);

        let html = match self.transport.get_text(&config.listing_url, &profile).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %config.listing_url, error = %e, "Listing page failed");
                return Ok(Vec::new());
            }
        };
        let candidates = listing_candidates(&html, config.link_base(), &config.selector_hints, None);
        info!(count = candidates.len(), "Listing links found");
        Ok(self.collect(&source.id, candidates, limit).await)
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub(super) async fn run_scrape_raw(&self, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let config = source
            .scrape_config()
            .ok_or_else(|| FetchError::Contract(format!("`{}` has no scrape configuration", source.id)))?;
        let profile = RequestProfile::new(MINIMAL_UA, self.transport.settings().page_timeout);

        let html = match self.transport.get_text(&config.listing_url, &profile).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %config.listing_url, error = %e, "Listing page failed");
                return Ok(Vec::new());
            }
        };
        let candidates = listing_candidates(&html, &config.listing_url, &[], Some(limit));
        Ok(self.collect(&source.id, candidates, limit).await)
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub(super) async fn run_generic(&self, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let Some(landing) = source.landing_page() else {
            return Err(FetchError::Contract(format!("`{}` has no page to start from", source.id)));
        };
        let profile = RequestProfile::new(MINIMAL_UA, self.transport.settings().page_timeout);

        let html = match self.transport.get_text(&landing, &profile).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %landing, error = %e, "Landing page failed");
                return Ok(Vec::new());
            }
        };

        for raw in GENERIC_SELECTORS {
            let Ok(pattern) = Selector::parse(raw) else {
                continue;
            };
            let candidates = generic_candidates(&html, &landing, &pattern, limit);
            if candidates.is_empty() {
                continue;
            }
            let articles = self.collect(&source.id, candidates, limit).await;
            if !articles.is_empty() {
                info!(pattern = raw, count = articles.len(), "Generic pattern produced articles");
                return Ok(articles);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{Strategy, StrategyRunner};
    use crate::testing::{FixtureServer, article_page, local_runner, not_found, scrape_source_at};

    const SHORT_ANCHORS: &str = r#"
        <a href="/news/1">Sports</a>
        <a href="/news/2">Weather</a>
        <a href="/article/3">Opinion</a>
        <a href="/">Home</a>
    "#;

    const LISTING: &str = r#"
        <nav><a href="/about">About this newspaper and staff</a></nav>
        <section class="headlines">
          <a href="/news/1">Storm closes schools across the region</a>
          <a href="/news/2">Council approves new tram line plan</a>
        </section>
    "#;

    async fn listing_server(page: &'static str) -> FixtureServer {
        FixtureServer::start(move |request| match request.path.as_str() {
            "/" | "/latest" => (200, page.to_string()),
            path if path.starts_with("/news/") => (200, article_page(&format!("Story at {path}."))),
            _ => not_found(),
        })
        .await
    }

    fn base() -> Url {
        Url::parse("https://news.example.com/latest/").unwrap()
    }

    #[test]
    fn test_short_titles_are_dropped() {
        let html = r#"
            <a href="/a">Home</a>
            <a href="/b">World</a>
            <a href="/c">0123456789</a>
        "#;
        assert!(listing_candidates(html, &base(), &[], None).is_empty());
    }

    #[test]
    fn test_relative_links_resolve_against_base() {
        let html = r#"<a href="2025/01/story.html">Parliament passes the budget bill</a>"#;
        let candidates = listing_candidates(html, &base(), &[], None);
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].url.as_str(),
            "https://news.example.com/latest/2025/01/story.html"
        );
        assert_eq!(candidates[0].title, "Parliament passes the budget bill");
    }

    #[test]
    fn test_selector_hints_scope_the_listing() {
        let html = r#"
            <nav><a href="/about">About this newspaper and staff</a></nav>
            <section class="headlines">
              <a href="/s/1">Storm closes schools across the region</a>
              <div><a href="/s/2">Council approves new tram line plan</a></div>
            </section>
        "#;
        let hints = vec![".headlines".to_string()];
        let candidates = listing_candidates(html, &base(), &hints, None);
        let urls: Vec<_> = candidates.iter().map(|c| c.url.path().to_string()).collect();
        assert_eq!(urls, vec!["/s/1", "/s/2"]);
    }

    #[test]
    fn test_max_anchors_counts_before_filtering() {
        let html = r#"
            <a href="/x">Menu</a>
            <a href="/s/1">Storm closes schools across the region</a>
            <a href="/s/2">Council approves new tram line plan</a>
        "#;
        let candidates = listing_candidates(html, &base(), &[], Some(2));
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_generic_pattern_matches() {
        let html = r#"
            <a href="/about/team">Meet the whole editorial team</a>
            <a href="/news/2025/markets.html">Markets close higher on rate hopes</a>
        "#;
        let pattern = Selector::parse(GENERIC_SELECTORS[2]).unwrap();
        let candidates = generic_candidates(html, &base(), &pattern, 5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url.path(), "/news/2025/markets.html");
    }

    #[test]
    fn test_javascript_links_are_dropped() {
        let html = r#"<a href="javascript:void(0)">Load more stories from the archive</a>"#;
        assert!(listing_candidates(html, &base(), &[], None).is_empty());
    }

    #[tokio::test]
    async fn test_short_anchor_listing_yields_nothing() {
        let server = listing_server(SHORT_ANCHORS).await;
        let source = scrape_source_at("tiny", server.url("/latest"), server.url("/"), &[]);
        let runner = local_runner();

        for strategy in [Strategy::ScrapeStructured, Strategy::ScrapeRaw, Strategy::Generic] {
            let articles = runner.run(&strategy, &source, 5).await.unwrap();
            assert!(articles.is_empty(), "{}", strategy.name());
        }
        assert_eq!(server.paths(), vec!["/latest", "/latest", "/"]);
    }

    #[tokio::test]
    async fn test_structured_scrape_reads_hinted_section() {
        let server = listing_server(LISTING).await;
        let source = scrape_source_at("daily", server.url("/latest"), server.url("/"), &[".headlines"]);

        let articles = local_runner().run(&Strategy::ScrapeStructured, &source, 5).await.unwrap();
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Storm closes schools across the region", "Council approves new tram line plan"]
        );
        assert!(articles[0].body.starts_with("Story at /news/1."));
    }

    #[tokio::test]
    async fn test_raw_scrape_inspects_only_first_anchors() {
        let server = listing_server(LISTING).await;
        let source = scrape_source_at("daily", server.url("/latest"), server.url("/"), &[]);

        let articles = local_runner().run(&Strategy::ScrapeRaw, &source, 1).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, server.url("/about").as_str());
        // The about page is missing, so the title stands in for the body.
        assert_eq!(articles[0].body, "About this newspaper and staff");
    }

    #[tokio::test]
    async fn test_generic_uses_article_url_patterns() {
        let server = listing_server(LISTING).await;
        let source = scrape_source_at("daily", server.url("/latest"), server.url("/"), &[]);

        let articles = local_runner().run(&Strategy::Generic, &source, 5).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.url.contains("/news/")));
        assert!(!server.paths().contains(&"/about".to_string()));
    }
}
