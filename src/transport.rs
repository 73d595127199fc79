//! Shared HTTP transport.
//!
//! Every request in the engine goes through [`Transport`], which owns one
//! `reqwest::Client` (connection pooling, optional proxy) and applies a
//! [`RequestProfile`] per call: the client identity, accept headers and the
//! timeout. Non-2xx answers are turned into [`FetchError::Status`] so callers
//! only deal with one failure shape.

use crate::error::{FetchError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Desktop browser identity used for page fetches.
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// Bare identity some feed hosts answer more reliably.
pub const MINIMAL_UA: &str = "Mozilla/5.0";

/// Identities cycled through by the alternate-identity feed strategy.
pub const ALTERNATE_IDENTITIES: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    "Googlebot/2.1 (+http://www.google.com/bot.html)",
    "Mozilla/5.0 (compatible; RSS/1.1; +http://www.google.com/rss)",
];

pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, */*";
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const CJK_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Headers and timeout applied to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestProfile {
    pub user_agent: &'static str,
    pub accept: Option<&'static str>,
    pub accept_language: Option<&'static str>,
    pub referer: Option<&'static str>,
    pub timeout: Duration,
}

impl RequestProfile {
    pub fn new(user_agent: &'static str, timeout: Duration) -> Self {
        Self {
            user_agent,
            accept: None,
            accept_language: None,
            referer: None,
            timeout,
        }
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn accept_language(mut self, accept_language: &'static str) -> Self {
        self.accept_language = Some(accept_language);
        self
    }

    pub fn referer(mut self, referer: &'static str) -> Self {
        self.referer = Some(referer);
        self
    }
}

/// Timeouts and proxy used to build a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Timeout for structured feed requests.
    pub feed_timeout: Duration,
    /// Timeout for everything else.
    pub page_timeout: Duration,
    pub proxy: Option<String>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            feed_timeout: Duration::from_secs(20),
            page_timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

/// Cheap to clone: every clone shares the same connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    settings: TransportSettings,
}

impl Transport {
    /// Build the shared client. Fails only on an unusable proxy URL.
    pub fn new(settings: TransportSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(proxy) = &settings.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        Ok(Self {
            client: builder.build()?,
            settings,
        })
    }

    /// The underlying client, for requests that need their own handling of
    /// the response.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Timeouts strategies pick their request profiles from.
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// GET `url` and return the decoded body.
    #[instrument(level = "debug", skip_all, fields(url = %url, ua = profile.user_agent))]
    pub async fn get_text(&self, url: &Url, profile: &RequestProfile) -> Result<String> {
        let mut request = self
            .client
            .get(url.clone())
            .timeout(profile.timeout)
            .header(USER_AGENT, profile.user_agent);
        if let Some(accept) = profile.accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(accept_language) = profile.accept_language {
            request = request.header(ACCEPT_LANGUAGE, accept_language);
        }
        if let Some(referer) = profile.referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Fetched");
        Ok(body)
    }

    /// Like [`Transport::get_text`], but when an `https` locator fails the
    /// same locator is retried over plain `http`. Legacy feed hosts with
    /// broken TLS setups are common enough to make this worth one request.
    pub async fn get_text_lenient(&self, url: &Url, profile: &RequestProfile) -> Result<String> {
        match self.get_text(url, profile).await {
            Ok(body) => Ok(body),
            Err(e) => match insecure_variant(url) {
                Some(fallback) => {
                    warn!(%url, error = %e, "Secure request failed; retrying over http");
                    self.get_text(&fallback, profile).await
                }
                None => Err(e),
            },
        }
    }
}

/// The `http://` twin of an `https://` URL.
pub fn insecure_variant(url: &Url) -> Option<Url> {
    if url.scheme() != "https" {
        return None;
    }
    let mut fallback = url.clone();
    fallback.set_scheme("http").ok()?;
    Some(fallback)
}
