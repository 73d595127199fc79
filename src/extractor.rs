//! Full-page article body extraction.
//!
//! Given an article URL, [`ContentExtractor::extract_body`] fetches the page
//! with a browser identity and walks a ranked selector list: known
//! article-body containers of specific sites first, broad semantic
//! containers next, bare paragraph selectors last. The first container whose
//! paragraphs add up to more than `min_body_chars` characters wins. If none
//! does, paragraphs anywhere on the page are tried under the same threshold.
//!
//! An empty string is a normal result; callers fall back to the feed
//! description or the title.
//!
//! The selector list is configuration data ([`ExtractorConfig`]) so it can
//! follow site markup changes without code changes.

use crate::transport::{BROWSER_UA, RequestProfile, Transport};
use crate::utils::{char_len, collapse_whitespace};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, instrument};

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Built-in body selectors, most specific first.
pub const DEFAULT_BODY_SELECTORS: &[&str] = &[
    "#artibody",
    ".article-content",
    "#article-body",
    ".article-body",
    "article",
    ".post-content",
    ".entry-content",
    "#content",
    ".article",
    "#article",
    ".news-content",
    ".story-body",
    "[itemprop=\"articleBody\"]",
    ".RichTextBody",
    ".body-content",
    ".blkContainerSblkCon",
    ".Body",
    "#ContentBody",
    ".em_con",
    ".article__bd__content",
    ".detail-content",
    "#articleContent",
    ".content-text",
    ".f_article",
    "main",
    ".post-body",
    ".content",
    "div.article",
    "div.post-content",
    "p",
    "div p",
    "span[data-testid=\"article-body\"]",
    "article p",
    ".text-content",
    "div[class*=\"content\"]",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Ranked container selectors.
    pub selectors: Vec<String>,
    /// Paragraphs read from a matched container.
    pub max_paragraphs: usize,
    /// Paragraphs read by the whole-page fallback.
    pub fallback_paragraphs: usize,
    /// A candidate body must be longer than this many characters.
    pub min_body_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            selectors: DEFAULT_BODY_SELECTORS.iter().map(|s| s.to_string()).collect(),
            max_paragraphs: 20,
            fallback_paragraphs: 25,
            min_body_chars: 100,
        }
    }
}

/// Fetches article pages and pulls their body text.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    transport: Transport,
    config: ExtractorConfig,
    selectors: Vec<Selector>,
}

impl ContentExtractor {
    pub fn new(transport: Transport, config: ExtractorConfig) -> Self {
        let selectors = compile_selectors(&config.selectors);
        Self {
            transport,
            config,
            selectors,
        }
    }

    /// Fetch `url` and return its body text, or an empty string.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn extract_body(&self, url: &str) -> String {
        let Ok(parsed) = url::Url::parse(url) else {
            debug!("Unparsable article URL");
            return String::new();
        };
        let profile = RequestProfile::new(BROWSER_UA, self.transport.settings().page_timeout);
        match self.transport.get_text(&parsed, &profile).await {
            Ok(html) => extract_from_html(&html, &self.selectors, &self.config),
            Err(e) => {
                debug!(error = %e, "Article page fetch failed");
                String::new()
            }
        }
    }
}

/// Parse selector strings, skipping the ones `scraper` rejects.
pub fn compile_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                debug!(selector = %s, error = ?e, "Skipping unparsable body selector");
                None
            }
        })
        .collect()
}

/// Run the ranked extraction over an already-fetched page.
pub fn extract_from_html(html: &str, selectors: &[Selector], config: &ExtractorConfig) -> String {
    let document = Html::parse_document(html);

    for selector in selectors {
        if let Some(container) = document.select(selector).next() {
            let text = join_paragraphs(container.select(&PARAGRAPH), config.max_paragraphs);
            if char_len(&text) > config.min_body_chars {
                return text;
            }
        }
    }

    let text = join_paragraphs(document.select(&PARAGRAPH), config.fallback_paragraphs);
    if char_len(&text) > config.min_body_chars {
        return text;
    }
    String::new()
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>, max: usize) -> String {
    paragraphs
        .take(max)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .join(" ")
}
