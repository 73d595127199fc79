//! Error types for the fetch engine and its configuration layer.
//!
//! Most failures in this crate are *expected*: a host times out, a feed is
//! malformed, a listing page has no usable anchors. Strategies swallow those
//! and return an empty list. [`FetchError`] exists for the places where an
//! error has to cross a function boundary before it is logged, and for the
//! [`FetchError::Contract`] case the orchestrator treats as "try the next
//! strategy".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A strategy was handed a source it cannot structurally work with.
    #[error("Strategy contract violated: {0}")]
    Contract(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("source `{0}` is a feed source without feed locators")]
    MissingFeedLocators(String),

    #[error("source `{0}` is a scrape source without a listing URL")]
    MissingListingUrl(String),

    #[error("source `{source_id}` has an invalid URL `{url}`")]
    InvalidUrl { source_id: String, url: String },

    #[error("source `{source_id}` has unknown kind `{kind}`")]
    UnknownKind { source_id: String, kind: String },

    #[error("source `{source_id}` names unknown site profile `{profile}`")]
    UnknownSiteProfile { source_id: String, profile: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
