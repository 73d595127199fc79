//! Site-specific listing scrapes.
//!
//! Some sources publish nothing a generic strategy can use reliably, but
//! their front pages have a stable shape. Each such site is described by a
//! [`SiteProfile`]: where to start, which elements hold the news items, which
//! links count. Profiles are data, not code; the override table maps source
//! ids to profiles and is resolved when the source catalogue is loaded.
//!
//! | Profile | Entry pages | Item shape |
//! |---------|-------------|------------|
//! | `sina_finance` | finance.sina.com.cn | any `/roll/` link |
//! | `eastmoney` | eastmoney.com (two variants) | media list items |
//! | `tonghuashun` | 10jqka.com.cn | list items, with referer |
//! | `china_securities` | cs.com.cn (three pages) | news lists, `/shtml`/`/html` links |
//! | `chinese_news` | source homepage | news lists with teaser text |

use super::{Candidate, HttpStrategyRunner, scrape};
use crate::error::{FetchError, Result};
use crate::language::Translator;
use crate::models::{Article, Source};
use crate::transport::{BROWSER_UA, CJK_ACCEPT_LANGUAGE, HTML_ACCEPT, RequestProfile};
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Declarative description of a site-specific listing scrape.
#[derive(Debug, PartialEq, Eq)]
pub struct SiteProfile {
    pub name: &'static str,
    /// Pages tried in order. Empty means "the source's homepage".
    pub entry_urls: &'static [&'static str],
    /// Item selectors; the first one matching anything on the page is used.
    pub item_selectors: &'static [&'static str],
    /// Items inspected per requested article. `None` inspects every match.
    pub items_per_article: Option<usize>,
    /// Base for relative links. `None` resolves against the page itself.
    pub link_base: Option<&'static str>,
    /// Links whose href contains any of these are dropped.
    pub href_excludes: &'static [&'static str],
    /// Titles must be longer than this many characters.
    pub min_title_chars: usize,
    /// Selector for a teaser inside the item, used when the article page
    /// itself yields nothing.
    pub teaser_selector: Option<&'static str>,
    pub referer: Option<&'static str>,
    /// Send `Accept`/`Accept-Language` headers the way a CJK browser does.
    pub browser_headers: bool,
}

pub static SINA_FINANCE: SiteProfile = SiteProfile {
    name: "sina_finance",
    entry_urls: &["https://finance.sina.com.cn/"],
    item_selectors: &["a[href*=\"/roll/\"]"],
    items_per_article: None,
    link_base: Some("https://finance.sina.com.cn/"),
    href_excludes: &["index.d.html", "page="],
    min_title_chars: 0,
    teaser_selector: None,
    referer: None,
    browser_headers: false,
};

pub static EASTMONEY: SiteProfile = SiteProfile {
    name: "eastmoney",
    entry_urls: &["https://www.eastmoney.com/default.html", "https://www.eastmoney.com/"],
    item_selectors: &[
        "#media_list_ul li",
        ".list-content li",
        ".news-item",
        "ul.media-list li",
        "#newsContent li",
        "a[href*=\"/news/\"]",
    ],
    items_per_article: Some(2),
    link_base: Some("https://www.eastmoney.com/"),
    href_excludes: &[],
    min_title_chars: 10,
    teaser_selector: None,
    referer: None,
    browser_headers: true,
};

pub static TONGHUASHUN: SiteProfile = SiteProfile {
    name: "tonghuashun",
    entry_urls: &["https://www.10jqka.com.cn/"],
    item_selectors: &[
        ".list-item",
        ".news-item",
        "a[href*=\"/news/\"]",
        ".article-list-item",
        "#newsList li",
        ".content-list li",
    ],
    items_per_article: Some(2),
    link_base: Some("https://www.10jqka.com.cn/"),
    href_excludes: &[],
    min_title_chars: 10,
    teaser_selector: None,
    referer: Some("https://www.10jqka.com.cn/"),
    browser_headers: true,
};

pub static CHINA_SECURITIES: SiteProfile = SiteProfile {
    name: "china_securities",
    entry_urls: &[
        "https://www.cs.com.cn/",
        "https://www.cs.com.cn/index.html",
        "https://www.cs.com.cn/news/",
    ],
    item_selectors: &[
        ".news-list li",
        ".news-item",
        ".article-list li",
        "ul.news li",
        ".content-list li",
        "a[href*=\"/news/\"]",
        "a[href*=\"/shtml\"]",
        "a[href*=\"/html\"]",
    ],
    items_per_article: Some(3),
    link_base: Some("https://www.cs.com.cn/"),
    href_excludes: &[],
    min_title_chars: 10,
    teaser_selector: None,
    referer: None,
    browser_headers: true,
};

pub static CHINESE_NEWS: SiteProfile = SiteProfile {
    name: "chinese_news",
    entry_urls: &[],
    item_selectors: &[
        ".news-list li",
        ".news-item",
        ".article-list li",
        "ul.news li",
        ".content-list li",
        "a[href*=\"/article/\"]",
        "a[href*=\"/news/\"]",
    ],
    items_per_article: Some(2),
    link_base: None,
    href_excludes: &[],
    min_title_chars: 10,
    teaser_selector: Some("[class*=\"summary\"], [class*=\"desc\"], [class*=\"excerpt\"]"),
    referer: None,
    browser_headers: true,
};

/// Every built-in profile, addressable by name from source configuration.
pub static PROFILES: &[&SiteProfile] = &[
    &SINA_FINANCE,
    &EASTMONEY,
    &TONGHUASHUN,
    &CHINA_SECURITIES,
    &CHINESE_NEWS,
];

/// Source ids that get a profile without asking for one.
static DEFAULT_OVERRIDES: &[(&str, &SiteProfile)] = &[
    ("sina_finance", &SINA_FINANCE),
    ("eastmoney", &EASTMONEY),
    ("tonghuashun", &TONGHUASHUN),
    ("china_securities", &CHINA_SECURITIES),
    ("securities_times", &CHINESE_NEWS),
    ("tencent_finance", &CHINESE_NEWS),
    ("sohu_finance", &CHINESE_NEWS),
];

pub fn profile_by_name(name: &str) -> Option<&'static SiteProfile> {
    PROFILES.iter().copied().find(|profile| profile.name == name)
}

pub fn default_override(source_id: &str) -> Option<&'static SiteProfile> {
    DEFAULT_OVERRIDES
        .iter()
        .find(|(id, _)| *id == source_id)
        .map(|(_, profile)| *profile)
}

impl SiteProfile {
    fn request_profile(&self, timeout: std::time::Duration) -> RequestProfile {
        let mut profile = RequestProfile::new(BROWSER_UA, timeout);
        if self.browser_headers {
            profile = profile.accept(HTML_ACCEPT).accept_language(CJK_ACCEPT_LANGUAGE);
        }
        if let Some(referer) = self.referer {
            profile = profile.referer(referer);
        }
        profile
    }

    fn entry_pages(&self, source: &Source) -> Result<Vec<Url>> {
        if self.entry_urls.is_empty() {
            return source.homepage.clone().map(|url| vec![url]).ok_or_else(|| {
                FetchError::Contract(format!(
                    "site profile `{}` needs a homepage on source `{}`",
                    self.name, source.id
                ))
            });
        }
        self.entry_urls
            .iter()
            .map(|raw| Url::parse(raw).map_err(|_| FetchError::InvalidUrl(raw.to_string())))
            .collect()
    }
}

/// Pull candidates from one entry page. Returns an empty list when no item
/// selector matches.
pub fn site_candidates(html: &str, page: &Url, profile: &SiteProfile, limit: usize) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let base = profile
        .link_base
        .and_then(|raw| Url::parse(raw).ok())
        .unwrap_or_else(|| page.clone());
    let teaser = profile.teaser_selector.and_then(|raw| Selector::parse(raw).ok());

    for raw in profile.item_selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let items: Vec<_> = document.select(&selector).collect();
        if items.is_empty() {
            continue;
        }
        debug!(profile = profile.name, selector = raw, matched = items.len(), "Item selector matched");

        let cap = profile
            .items_per_article
            .map_or(items.len(), |per| limit.saturating_mul(per));
        let rules = scrape::LinkRules {
            min_title_chars: profile.min_title_chars,
            href_excludes: profile.href_excludes,
        };
        let candidates = scrape::extract_links(items.into_iter().take(cap), &base, &rules, teaser.as_ref());
        if !candidates.is_empty() {
            return candidates;
        }
    }
    Vec::new()
}

impl<T: Translator> HttpStrategyRunner<T> {
    #[instrument(level = "info", skip_all, fields(source = %source.id, profile = profile.name))]
    pub(super) async fn run_site(
        &self,
        profile: &SiteProfile,
        source: &Source,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let request = profile.request_profile(self.transport.settings().page_timeout);

        for page in profile.entry_pages(source)? {
            let html = match self.transport.get_text(&page, &request).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %page, error = %e, "Site entry page failed");
                    continue;
                }
            };
            let candidates = site_candidates(&html, &page, profile, limit);
            let articles = self.collect(&source.id, candidates, limit).await;
            if !articles.is_empty() {
                info!(url = %page, count = articles.len(), "Site profile produced articles");
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
    use crate::testing::{FixtureServer, article_page, feed_source_at, local_runner, not_found};

    #[test]
    fn test_default_overrides_resolve() {
        assert_eq!(default_override("sina_finance").unwrap().name, "sina_finance");
        assert_eq!(default_override("sohu_finance").unwrap().name, "chinese_news");
        assert!(default_override("bbc").is_none());
    }

    #[test]
    fn test_profile_by_name() {
        assert_eq!(profile_by_name("eastmoney"), Some(&EASTMONEY));
        assert!(profile_by_name("nope").is_none());
    }

    #[test]
    fn test_all_profile_selectors_parse() {
        for profile in PROFILES {
            for raw in profile.item_selectors {
                assert!(Selector::parse(raw).is_ok(), "{} / {}", profile.name, raw);
            }
            if let Some(raw) = profile.teaser_selector {
                assert!(Selector::parse(raw).is_ok());
            }
        }
    }

    #[test]
    fn test_sina_links_skip_index_pages_and_duplicates() {
        let html = r#"
            <a href="//finance.sina.com.cn/roll/2025-01-02/doc-1.shtml">A股三大指数集体收涨</a>
            <a href="/roll/2025-01-02/doc-1.shtml">A股三大指数集体收涨</a>
            <a href="/roll/index.d.html?cid=1">滚动新闻</a>
            <a href="/roll/list?page=2">下一页</a>
            <a href="/other/doc-9.shtml">不是滚动新闻</a>
        "#;
        let page = Url::parse("https://finance.sina.com.cn/").unwrap();
        let candidates = site_candidates(html, &page, &SINA_FINANCE, 5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].url.as_str(),
            "https://finance.sina.com.cn/roll/2025-01-02/doc-1.shtml"
        );
    }

    #[test]
    fn test_first_matching_selector_wins() {
        let html = r#"
            <ul id="media_list_ul">
              <li><a href="/a/202501021.html">央行宣布下调存款准备金率零点五个百分点</a></li>
              <li><span>no link here</span></li>
            </ul>
            <div class="news-item"><a href="/b/2.html">这条来自第二个选择器的新闻不应该出现</a></div>
        "#;
        let page = Url::parse("https://www.eastmoney.com/").unwrap();
        let candidates = site_candidates(html, &page, &EASTMONEY, 5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url.as_str(), "https://www.eastmoney.com/a/202501021.html");
    }

    #[test]
    fn test_teaser_is_captured() {
        let html = r#"
            <ul class="news-list">
              <li><a href="/article/1.html">沪深两市成交额突破一万亿元大关</a>
                  <p class="news-desc">两市成交持续放量，北向资金净流入。</p></li>
            </ul>
        "#;
        let page = Url::parse("https://finance.example.cn/").unwrap();
        let candidates = site_candidates(html, &page, &CHINESE_NEWS, 5);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url.as_str(), "https://finance.example.cn/article/1.html");
        assert_eq!(candidates[0].teaser.as_deref(), Some("两市成交持续放量，北向资金净流入。"));
    }

    #[test]
    fn test_homepage_profile_requires_homepage() {
        let source = Source {
            id: "sohu_finance".to_string(),
            enabled: true,
            kind: crate::models::SourceKind::Feed {
                locators: vec![Url::parse("https://example.com/rss").unwrap()],
            },
            homepage: None,
            site_profiles: vec![&CHINESE_NEWS],
        };
        assert!(matches!(
            CHINESE_NEWS.entry_pages(&source),
            Err(FetchError::Contract(_))
        ));
    }

    const FRONT_PAGE: &str = r#"
        <ul class="news-list">
          <li><a href="/article/1.html">央行宣布下调存款准备金率零点五个百分点</a>
              <p class="news-desc">中国人民银行今日宣布下调金融机构存款准备金率，释放长期资金约一万亿元。</p></li>
          <li><a href="/article/2.html">沪深两市成交额突破一万亿元大关</a>
              <p class="news-desc">两市成交持续放量，北向资金净流入。</p></li>
        </ul>
    "#;

    #[tokio::test]
    async fn test_homepage_profile_against_front_page() {
        let server = FixtureServer::start(|request| match request.path.as_str() {
            "/" => (200, FRONT_PAGE.to_string()),
            "/article/2.html" => (200, article_page("两市成交额连续三日突破一万亿元。")),
            _ => not_found(),
        })
        .await;
        let mut source = feed_source_at("sohu_finance", vec![server.url("/rss.xml")]);
        source.homepage = Some(server.url("/"));

        let articles = local_runner()
            .run(&Strategy::Site(&CHINESE_NEWS), &source, 5)
            .await
            .unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles[0].body.starts_with("中国人民银行今日宣布"));
        assert!(articles[1].body.starts_with("两市成交额连续三日突破一万亿元。"));
        // Only the item with a short teaser needed its page.
        assert_eq!(server.paths(), vec!["/", "/article/2.html"]);
    }

    #[tokio::test]
    async fn test_homepage_profile_without_matching_items() {
        let server = FixtureServer::start(|_| (200, "<p>维护中</p>".to_string())).await;
        let mut source = feed_source_at("sohu_finance", vec![server.url("/rss.xml")]);
        source.homepage = Some(server.url("/"));

        let articles = local_runner()
            .run(&Strategy::Site(&CHINESE_NEWS), &source, 5)
            .await
            .unwrap();
        assert!(articles.is_empty());
    }
}
