//! RSS/Atom strategies.
//!
//! Two parsers back these strategies. [`parse_structured`] is a strict serde
//! parse of RSS 2.0 and fails on anything malformed. [`scan_raw`] pulls
//! `<item>`/`<entry>` blocks out with regular expressions, which survives
//! broken markup, unescaped entities and Atom feeds.

use super::{Candidate, HttpStrategyRunner};
use crate::error::{FetchError, Result};
use crate::language::Translator;
use crate::models::{Article, Source};
use crate::transport::{ALTERNATE_IDENTITIES, BROWSER_UA, FEED_ACCEPT, MINIMAL_UA, RequestProfile, insecure_variant};
use crate::utils::{resolve_link, strip_tags};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::iter;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

/// One feed item, text already cleaned of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
}

static ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)>").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").unwrap());
static LINK_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link(?:\s[^>]*)?>([^<]*)</link>").unwrap());
static LINK_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).unwrap());
static DESCRIPTIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<description\b[^>]*>(.*?)</description>",
        r"(?is)<summary\b[^>]*>(.*?)</summary>",
        r"(?is)<content:encoded\b[^>]*>(.*?)</content:encoded>",
        r"(?is)<content\b[^>]*>(.*?)</content>",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});
static CDATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

/// Strict RSS 2.0 parse. Items without a title or link are skipped.
pub fn parse_structured(xml: &str) -> Result<Vec<FeedEntry>> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.title.map(|t| strip_tags(&t)).filter(|t| !t.is_empty())?;
            let link = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
            let description = item.description.map(|d| strip_tags(&d)).filter(|d| !d.is_empty());
            Some(FeedEntry {
                title,
                link,
                description,
            })
        })
        .collect())
}

/// Tolerant scan for RSS `<item>` and Atom `<entry>` blocks.
pub fn scan_raw(xml: &str) -> Vec<FeedEntry> {
    ITEM.captures_iter(xml)
        .filter_map(|block| {
            let block = block.get(1)?.as_str();
            let title = capture_text(&TITLE, block).filter(|t| !t.is_empty())?;
            let link = capture_text(&LINK_TEXT, block)
                .filter(|l| !l.is_empty())
                .or_else(|| capture_text(&LINK_HREF, block))
                .filter(|l| !l.is_empty())?;
            let description = DESCRIPTIONS
                .iter()
                .find_map(|pattern| capture_text(pattern, block).filter(|d| !d.is_empty()));
            Some(FeedEntry {
                title,
                link,
                description,
            })
        })
        .collect()
}

fn capture_text(pattern: &Regex, block: &str) -> Option<String> {
    let raw = pattern.captures(block)?.get(1)?.as_str();
    Some(clean_text(raw))
}

/// Unwrap CDATA, decode entities where possible, drop markup.
fn clean_text(raw: &str) -> String {
    let unwrapped = CDATA.replace_all(raw, "$1");
    let decoded = quick_xml::escape::unescape(&unwrapped)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| unwrapped.to_string());
    strip_tags(&decoded)
}

/// Resolve entry links against the feed they came from.
pub fn entries_to_candidates(entries: Vec<FeedEntry>, feed: &Url) -> Vec<Candidate> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let url = resolve_link(feed, &entry.link)?;
            Some(Candidate {
                title: entry.title,
                url,
                teaser: entry.description,
            })
        })
        .collect()
}

/// Items taken from each locator when a source has `locators` feeds.
pub fn per_locator_quota(limit: usize, locators: usize) -> usize {
    (limit / locators.max(1)).max(1) + 2
}

fn require_locators(source: &Source) -> Result<&[Url]> {
    let locators = source.feed_locators();
    if locators.is_empty() {
        return Err(FetchError::Contract(format!("`{}` has no feed locators", source.id)));
    }
    Ok(locators)
}

impl<T: Translator> HttpStrategyRunner<T> {
    /// Strict parse of `locator`, then of its plain-http twin if the first
    /// attempt fails or has no items.
    async fn structured_entries(&self, locator: &Url, profile: &RequestProfile) -> Vec<FeedEntry> {
        for url in iter::once(locator.clone()).chain(insecure_variant(locator)) {
            let xml = match self.transport.get_text(&url, profile).await {
                Ok(xml) => xml,
                Err(e) => {
                    warn!(%url, error = %e, "Feed request failed");
                    continue;
                }
            };
            match parse_structured(&xml) {
                Ok(entries) if !entries.is_empty() => return entries,
                Ok(_) => debug!(%url, "Feed has no items"),
                Err(e) => debug!(%url, error = %e, "Feed is not well-formed RSS"),
            }
        }
        Vec::new()
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub(super) async fn run_feed_structured(&self, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let locators = require_locators(source)?;
        let quota = per_locator_quota(limit, locators.len());
        let profile = RequestProfile::new(MINIMAL_UA, self.transport.settings().feed_timeout);

        let mut articles = Vec::new();
        for locator in locators {
            if articles.len() >= limit {
                break;
            }
            let entries = self.structured_entries(locator, &profile).await;
            let candidates = entries_to_candidates(entries, locator)
                .into_iter()
                .take(quota)
                .collect();
            let batch = self.collect(&source.id, candidates, limit - articles.len()).await;
            info!(url = %locator, count = batch.len(), "Feed locator done");
            articles.extend(batch);
        }
        Ok(articles)
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id))]
    pub(super) async fn run_feed_raw(&self, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let locator = &require_locators(source)?[0];
        let profile = RequestProfile::new(BROWSER_UA, self.transport.settings().page_timeout).accept(FEED_ACCEPT);

        let xml = match self.transport.get_text_lenient(locator, &profile).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(url = %locator, error = %e, "Raw feed request failed");
                return Ok(Vec::new());
            }
        };
        let candidates = entries_to_candidates(scan_raw(&xml), locator);
        info!(count = candidates.len(), "Raw feed entries found");
        Ok(self.collect(&source.id, candidates, limit).await)
    }

    #[instrument(level = "info", skip_all, fields(source = %source.id, url = %locator))]
    pub(super) async fn run_feed_alt_identity(
        &self,
        locator: &Url,
        source: &Source,
        limit: usize,
    ) -> Result<Vec<Article>> {
        for identity in ALTERNATE_IDENTITIES {
            let profile = RequestProfile::new(identity, self.transport.settings().feed_timeout).accept(FEED_ACCEPT);
            let xml = match self.transport.get_text_lenient(locator, &profile).await {
                Ok(xml) => xml,
                Err(e) => {
                    debug!(ua = identity, error = %e, "Identity rejected");
                    continue;
                }
            };
            let entries = match parse_structured(&xml) {
                Ok(entries) if !entries.is_empty() => entries,
                _ => scan_raw(&xml),
            };
            let articles = self
                .collect(&source.id, entries_to_candidates(entries, locator), limit)
                .await;
            if !articles.is_empty() {
                info!(ua = identity, count = articles.len(), "Identity accepted");
                return Ok(articles);
            }
        }
        Ok(Vec::new())
    }
}
