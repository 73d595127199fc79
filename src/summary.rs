//! Short summaries derived from article bodies.
//!
//! The summary is deliberately cheap: the first two meaningful sentences of
//! the body, with editor/attribution credits stripped and each line capped
//! at [`MAX_LINE_CHARS`] characters. Real summarization is a downstream
//! concern.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum characters per summary line before the ellipsis.
pub const MAX_LINE_CHARS: usize = 80;
const MAX_SENTENCES: usize = 2;
const MIN_SENTENCE_CHARS: usize = 5;
const ELLIPSIS: &str = "...";

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[。\n\r.!]+").unwrap());
static BOILERPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:责任编辑|来源)：.*|(?i:\beditor|\bsource):.*").unwrap());

/// Build the summary for an article.
///
/// Falls back to the (truncated) title when the body has no sentence longer
/// than five characters.
pub fn derive_summary(title: &str, body: &str) -> String {
    let lines: Vec<String> = SENTENCE_BOUNDARY
        .split(body)
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > MIN_SENTENCE_CHARS)
        .take(MAX_SENTENCES)
        .map(|sentence| BOILERPLATE.replace(sentence, "").trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| truncate_chars(&sentence, MAX_LINE_CHARS))
        .collect();

    if lines.is_empty() {
        truncate_chars(title.trim(), MAX_LINE_CHARS)
    } else {
        lines.join("\n")
    }
}

/// Cut `text` to `max` characters, appending `...` when something was cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_first_two_sentences() {
        let body = "Markets rallied on Monday. Bonds slipped slightly! A third sentence follows.";
        assert_eq!(
            derive_summary("t", body),
            "Markets rallied on Monday\nBonds slipped slightly"
        );
    }

    #[test]
    fn test_skips_short_fragments() {
        let body = "Ok. Yes. The central bank held rates steady.";
        assert_eq!(derive_summary("t", body), "The central bank held rates steady");
    }

    #[test]
    fn test_splits_on_cjk_full_stop() {
        let body = "央行宣布维持利率不变以稳定市场。分析人士认为这一决定符合预期。第三句";
        assert_eq!(
            derive_summary("t", body),
            "央行宣布维持利率不变以稳定市场\n分析人士认为这一决定符合预期"
        );
    }

    #[test]
    fn test_strips_editor_credits() {
        let body = "股市今日全线上涨表现强劲 责任编辑：张三\n另一条重要的市场消息来了";
        let summary = derive_summary("t", body);
        assert!(!summary.contains("责任编辑"));
        assert!(summary.starts_with("股市今日全线上涨表现强劲"));
    }

    #[test]
    fn test_truncates_long_sentences() {
        let body = format!("{}.", "x".repeat(200));
        let summary = derive_summary("t", &body);
        assert_eq!(summary.chars().count(), MAX_LINE_CHARS + ELLIPSIS.len());
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_falls_back_to_title() {
        assert_eq!(derive_summary("Short title", "Hi. No."), "Short title");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("新闻标题", 2), "新闻...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
