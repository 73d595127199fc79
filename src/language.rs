//! Language normalization: a crude foreign-language check plus best-effort
//! translation.
//!
//! # The heuristic
//!
//! [`is_foreign_language`] does **not** identify languages. It counts
//! single-byte characters (code points below 128) and calls the text foreign
//! when they make up more than 60% of it. For a CJK-reading audience that
//! separates English headlines from Chinese ones well enough, with known
//! failure modes:
//!
//! - Short strings swing wildly: `"5G手机"` and `"A股"` sit at 50%.
//! - Mixed-script headlines full of tickers and numbers cross the line:
//!   `"GDP增长3%"` is 71% single-byte and gets sent for translation.
//! - Any Latin-script language (French, German...) counts as foreign.
//!
//! The 0.6 threshold was tuned for that audience; swapping in a real
//! language-ID model means re-validating it.
//!
//! # Translation
//!
//! [`Translator`] implementations never fail: any transport or decoding
//! problem returns the input unchanged.

use crate::transport::{MINIMAL_UA, Transport};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Share of single-byte characters above which text counts as foreign.
pub const FOREIGN_THRESHOLD: f64 = 0.6;

/// True when more than 60% of the characters in `text` are single-byte.
/// Exactly 60% is not foreign; empty text is not foreign.
pub fn is_foreign_language(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let single_byte = text.chars().filter(char::is_ascii).count();
    single_byte as f64 / total as f64 > FOREIGN_THRESHOLD
}

/// Best-effort translation service.
pub trait Translator {
    /// Translate `text`, returning it unchanged on any failure.
    async fn translate(&self, text: &str) -> String;
}

/// Translator that never calls out. Used when translation is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    async fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Translation endpoint settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub source_lang: String,
    pub target_lang: String,
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            source_lang: "en".to_string(),
            target_lang: "zh-CN".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Client for the public `translate_a/single` endpoint (`gtx` client).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    transport: Transport,
    config: TranslationConfig,
}

impl GoogleTranslator {
    pub fn new(transport: Transport, config: TranslationConfig) -> Self {
        Self { transport, config }
    }

    fn request_url(&self, text: &str) -> String {
        format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.config.endpoint,
            urlencoding::encode(&self.config.source_lang),
            urlencoding::encode(&self.config.target_lang),
            urlencoding::encode(text)
        )
    }
}

impl Translator for GoogleTranslator {
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    async fn translate(&self, text: &str) -> String {
        if !self.config.enabled || text.trim().is_empty() || !is_foreign_language(text) {
            return text.to_string();
        }

        let response = self
            .transport
            .client()
            .get(self.request_url(text))
            .header(reqwest::header::USER_AGENT, MINIMAL_UA)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body = match response {
            Ok(r) => r.text().await.ok(),
            Err(e) => {
                warn!(error = %e, "Translation request failed; keeping original text");
                return text.to_string();
            }
        };

        let translated = body
            .and_then(|body| serde_json::from_str::<Value>(&body).ok())
            .and_then(|value| parse_translation(&value));
        match translated {
            Some(translated) => {
                debug!("Translated text");
                translated
            }
            None => {
                warn!("Translation response unusable; keeping original text");
                text.to_string()
            }
        }
    }
}

/// Concatenate the translated segments of a `translate_a/single` response:
/// `[[["译文", "source", ...], ...], ...]`.
pub fn parse_translation(value: &Value) -> Option<String> {
    let segments = value.get(0)?.as_array()?;
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();
    (!translated.is_empty()).then_some(translated)
}

/// Translate title and content together when the title looks foreign.
pub async fn normalize<T: Translator>(translator: &T, title: String, content: String) -> (String, String) {
    if !is_foreign_language(&title) {
        return (title, content);
    }
    let title = translator.translate(&title).await;
    let content = translator.translate(&content).await;
    (title, content)
}
