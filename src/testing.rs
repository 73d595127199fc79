//! Test doubles shared across the crate: a scripted strategy runner for the
//! orchestrator and coordinator, and a local fixture server for everything
//! that goes over HTTP.

use crate::error::{FetchError, Result};
use crate::extractor::ExtractorConfig;
use crate::language::Passthrough;
use crate::models::{Article, ScrapeConfig, Source, SourceKind};
use crate::strategies::{HttpStrategyRunner, Strategy, StrategyRunner};
use crate::transport::{Transport, TransportSettings};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

/// What a scripted strategy does when run.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Produce this many articles (capped by the limit).
    Articles(usize),
    Contract,
}

/// Runner that answers from a script keyed by `(source id, strategy name)`
/// and records every call. Unscripted strategies find nothing.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: HashMap<(String, String), Script>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRunner {
    pub fn with(mut self, source_id: &str, strategy: &str, script: Script) -> Self {
        self.script
            .insert((source_id.to_string(), strategy.to_string()), script);
        self
    }

    /// Strategy names run for `source_id`, in call order.
    pub fn calls_for(&self, source_id: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == source_id)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl StrategyRunner for ScriptedRunner {
    async fn run(&self, strategy: &Strategy, source: &Source, limit: usize) -> Result<Vec<Article>> {
        let name = strategy.name();
        self.calls
            .lock()
            .unwrap()
            .push((source.id.clone(), name.clone()));

        match self.script.get(&(source.id.clone(), name.clone())) {
            Some(Script::Articles(count)) => Ok((0..*count)
                .take(limit)
                .filter_map(|i| {
                    Article::new(
                        &source.id,
                        &format!("Story {i} via {name}"),
                        &format!("https://example.com/{}/{name}/{i}", source.id),
                        "",
                    )
                })
                .collect()),
            Some(Script::Contract) => Err(FetchError::Contract(format!("scripted failure for {name}"))),
            None => Ok(Vec::new()),
        }
    }
}

pub fn feed_source(id: &str, locators: usize) -> Source {
    Source {
        id: id.to_string(),
        enabled: true,
        kind: SourceKind::Feed {
            locators: (0..locators)
                .map(|i| Url::parse(&format!("https://example.com/{id}/rss/{i}.xml")).unwrap())
                .collect(),
        },
        homepage: None,
        site_profiles: vec![],
    }
}

pub fn scrape_source(id: &str) -> Source {
    Source {
        id: id.to_string(),
        enabled: true,
        kind: SourceKind::Scrape(ScrapeConfig {
            listing_url: Url::parse(&format!("https://example.com/{id}/latest")).unwrap(),
            base_url: None,
            selector_hints: vec![],
        }),
        homepage: None,
        site_profiles: vec![],
    }
}

/// A request as seen by [`FixtureServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Path plus query string.
    pub path: String,
    pub user_agent: String,
}

impl Request {
    fn parse(head: &str) -> Request {
        let mut lines = head.lines();
        let path = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        let user_agent = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default();
        Request { path, user_agent }
    }
}

type Handler = dyn Fn(&Request) -> (u16, String) + Send + Sync;

/// Plain HTTP/1.1 server on `127.0.0.1:0`. Every connection gets exactly one
/// answer from the handler and is then closed. Anything that is not an HTTP
/// request (a TLS handshake, say) is dropped without an answer.
pub struct FixtureServer {
    base: Url,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl FixtureServer {
    pub async fn start<F>(handler: F) -> FixtureServer
    where
        F: Fn(&Request) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(answer(socket, handler.clone(), seen.clone()));
            }
        });
        FixtureServer { base, requests }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path).unwrap()
    }

    /// The same location over `https`, which this server cannot speak.
    pub fn secure_url(&self, path: &str) -> Url {
        let mut url = self.url(path);
        url.set_scheme("https").unwrap();
        url
    }

    /// Requests answered so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }
}

async fn answer(mut socket: TcpStream, handler: Arc<Handler>, seen: Arc<Mutex<Vec<Request>>>) {
    let mut buf = vec![0u8; 16 * 1024];
    let mut read = 0;
    loop {
        let n = match socket.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        read += n;
        if !buf[0].is_ascii_uppercase() {
            return;
        }
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") || read == buf.len() {
            break;
        }
    }

    let request = Request::parse(&String::from_utf8_lossy(&buf[..read]));
    let (status, body) = handler(&request);
    seen.lock().unwrap().push(request);

    let reason = if status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

pub fn not_found() -> (u16, String) {
    (404, String::new())
}

/// Transport with short timeouts for fixture-server tests.
pub fn local_transport() -> Transport {
    Transport::new(TransportSettings {
        feed_timeout: Duration::from_secs(5),
        page_timeout: Duration::from_secs(5),
        proxy: None,
    })
    .unwrap()
}

/// Real HTTP runner over [`local_transport`], without translation.
pub fn local_runner() -> HttpStrategyRunner<Passthrough> {
    HttpStrategyRunner::new(local_transport(), ExtractorConfig::default(), Passthrough)
}

/// Feed source whose locators are the given URLs.
pub fn feed_source_at(id: &str, locators: Vec<Url>) -> Source {
    Source {
        id: id.to_string(),
        enabled: true,
        kind: SourceKind::Feed { locators },
        homepage: None,
        site_profiles: vec![],
    }
}

/// Scrape source reading `listing` with `homepage` as its landing page.
pub fn scrape_source_at(id: &str, listing: Url, homepage: Url, hints: &[&str]) -> Source {
    Source {
        id: id.to_string(),
        enabled: true,
        kind: SourceKind::Scrape(ScrapeConfig {
            listing_url: listing,
            base_url: None,
            selector_hints: hints.iter().map(|h| h.to_string()).collect(),
        }),
        homepage: Some(homepage),
        site_profiles: vec![],
    }
}

/// An article page whose body clears the extractor threshold.
pub fn article_page(lead: &str) -> String {
    format!(
        "<html><body><nav><a href=\"/\">Home</a></nav><article><p>{lead}</p><p>{}</p></article></body></html>",
        "Officials said the decision followed weeks of consultation with regional partners. ".repeat(2)
    )
}
