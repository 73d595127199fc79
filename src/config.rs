//! Configuration loading: engine settings and the source catalogue.
//!
//! # Engine settings (`newsfetch.yaml`)
//!
//! Every field is optional:
//!
//! ```yaml
//! memory_path: data/success_methods.json
//! limit_per_source: 5
//! retry_delay_ms: 1000
//! feed_timeout_secs: 20
//! page_timeout_secs: 30
//! proxy: http://127.0.0.1:7897
//! translation:
//!   enabled: true
//!   target_lang: zh-CN
//! extractor:
//!   min_body_chars: 100
//! ```
//!
//! # Source catalogue (`sources.yaml`)
//!
//! ```yaml
//! sources:
//!   bbc:
//!     type: rss
//!     enabled: true
//!     rss_feeds: [https://feeds.bbci.co.uk/news/world/rss.xml]
//!     url: https://www.bbc.com/news
//!   cs_listing:
//!     kind: scrape
//!     enabled: false
//!     scrape_config:
//!       article_list: https://www.cs.com.cn/xwzx/
//!       article_selector: .news-list
//!     site_profile: china_securities
//! ```
//!
//! Sources are disabled unless they say `enabled: true`. Mapping order is
//! run order. Entries are validated one at a time, so a broken entry becomes
//! a [`SourceEntry::Invalid`] instead of failing the whole file.

use crate::error::ConfigError;
use crate::extractor::ExtractorConfig;
use crate::language::TranslationConfig;
use crate::models::{ScrapeConfig, Source, SourceEntry, SourceKind};
use crate::orchestrator::OrchestratorSettings;
use crate::strategies::sites::{default_override, profile_by_name};
use crate::transport::TransportSettings;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub memory_path: PathBuf,
    pub limit_per_source: usize,
    pub retry_delay_ms: u64,
    pub feed_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub proxy: Option<String>,
    pub translation: TranslationConfig,
    pub extractor: ExtractorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_path: PathBuf::from("data/success_methods.json"),
            limit_per_source: 5,
            retry_delay_ms: 1000,
            feed_timeout_secs: 20,
            page_timeout_secs: 30,
            proxy: None,
            translation: TranslationConfig::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl EngineConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&raw)?;
        info!("Loaded engine configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            feed_timeout: Duration::from_secs(self.feed_timeout_secs),
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            proxy: self.proxy.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Mapping,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(alias = "type")]
    kind: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(alias = "rss_feeds", default)]
    feed_locators: Vec<String>,
    scrape_config: Option<RawScrapeConfig>,
    #[serde(alias = "url")]
    homepage: Option<String>,
    site_profile: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawScrapeConfig {
    #[serde(alias = "article_list")]
    listing_url: Option<String>,
    base_url: Option<String>,
    #[serde(alias = "article_selector")]
    selector_hints: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<SourceEntry>, ConfigError> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let entries = parse_sources(&raw)?;
    let invalid = entries
        .iter()
        .filter(|entry| matches!(entry, SourceEntry::Invalid { .. }))
        .count();
    info!(count = entries.len(), invalid, "Loaded source catalogue");
    Ok(entries)
}

/// Parse a catalogue. Only a document that is not YAML at all, or whose
/// `sources` key is not a mapping, is an error.
pub fn parse_sources(raw: &str) -> Result<Vec<SourceEntry>, ConfigError> {
    let file: SourcesFile = serde_yaml::from_str(raw)?;
    Ok(file
        .sources
        .into_iter()
        .map(|(key, value)| entry_from_yaml(key, value))
        .collect())
}

fn entry_from_yaml(key: Value, value: Value) -> SourceEntry {
    let id = match key {
        Value::String(id) => id,
        Value::Number(n) => n.to_string(),
        other => format!("{other:?}"),
    };
    let enabled = value.get("enabled").and_then(Value::as_bool).unwrap_or(false);

    let built = serde_yaml::from_value::<RawSource>(value)
        .map_err(ConfigError::from)
        .and_then(|raw| build_source(&id, raw));
    match built {
        Ok(source) => SourceEntry::Valid(source),
        Err(e) => {
            warn!(source = %id, error = %e, "Invalid source configuration");
            SourceEntry::Invalid {
                id,
                enabled,
                reason: e.to_string(),
            }
        }
    }
}

fn build_source(id: &str, raw: RawSource) -> Result<Source, ConfigError> {
    let kind_name = raw
        .kind
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| match raw.scrape_config {
            Some(_) => "scrape".to_string(),
            None => "feed".to_string(),
        });

    let kind = match kind_name.as_str() {
        "feed" | "rss" => {
            if raw.feed_locators.is_empty() {
                return Err(ConfigError::MissingFeedLocators(id.to_string()));
            }
            let locators = raw
                .feed_locators
                .iter()
                .map(|locator| parse_url(id, locator))
                .collect::<Result<Vec<_>, _>>()?;
            SourceKind::Feed { locators }
        }
        "scrape" => {
            let config = raw
                .scrape_config
                .ok_or_else(|| ConfigError::MissingListingUrl(id.to_string()))?;
            let listing = config
                .listing_url
                .ok_or_else(|| ConfigError::MissingListingUrl(id.to_string()))?;
            SourceKind::Scrape(ScrapeConfig {
                listing_url: parse_url(id, &listing)?,
                base_url: config.base_url.as_deref().map(|url| parse_url(id, url)).transpose()?,
                selector_hints: config.selector_hints.map(OneOrMany::into_vec).unwrap_or_default(),
            })
        }
        other => {
            return Err(ConfigError::UnknownKind {
                source_id: id.to_string(),
                kind: other.to_string(),
            });
        }
    };

    let homepage = raw.homepage.as_deref().map(|url| parse_url(id, url)).transpose()?;

    let site_profiles = match raw.site_profile {
        Some(name) => vec![profile_by_name(&name).ok_or_else(|| ConfigError::UnknownSiteProfile {
            source_id: id.to_string(),
            profile: name.clone(),
        })?],
        None => default_override(id).into_iter().collect(),
    };

    Ok(Source {
        id: id.to_string(),
        enabled: raw.enabled,
        kind,
        homepage,
        site_profiles,
    })
}

fn parse_url(source_id: &str, raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        source_id: source_id.to_string(),
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}
