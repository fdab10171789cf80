//! Stažení hawk.live přes řetěz strategií.
//!
//! Nejdřív přímý HTTP na všechny kandidátní URL, pak fallbacky (proxy, proxy
//! s renderem JS, headless Chrome). Každý pokus se zapisuje jako
//! [`FetchAttempt`], aby šlo při selhání zpětně zjistit, co vrátil zdroj.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::Serialize;
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, warn};

pub const DEFAULT_CANDIDATE_URLS: [&str; 4] = [
    "https://hawk.live/",
    "https://hawk.live/en",
    "https://hawk.live/dota2",
    "https://hawk.live/en/dota2",
];

pub const DEFAULT_PROXY_ENDPOINT: &str = "https://api.scrape.do/";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

const SNIPPET_SOURCE_BYTES: usize = 1000;
const SNIPPET_CHARS: usize = 220;

/// Diagnostic record of one strategy/URL attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchAttempt {
    pub strategy: String,
    pub url: String,
    pub http_status: Option<u16>,
    pub error: Option<String>,
    pub byte_count: usize,
    pub matched: bool,
    pub body_snippet: String,
}

/// Raw result of a single fetch, before classification.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub status: Option<u16>,
    pub body: Option<String>,
    pub error: Option<String>,
}

impl FetchOutcome {
    pub fn body(status: Option<u16>, body: String) -> Self {
        Self { status, body: Some(body), error: None }
    }

    pub fn failed(status: Option<u16>, error: impl ToString) -> Self {
        Self { status, body: None, error: Some(error.to_string()) }
    }
}

#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Page likely carries series data (server-rendered list or Inertia state).
pub fn has_usable_data(body: &str) -> bool {
    body.contains("series-list__item")
        || body.contains("data-page=")
        || (body.contains("id=\"app\"") && body.contains("SeriesListView"))
}

/// Tag-stripped, whitespace-collapsed start of a body for the diagnostic log.
pub fn body_snippet(body: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    let mut cut = body.len().min(SNIPPET_SOURCE_BYTES);
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    let head = &body[..cut];
    let stripped = match TAGS.get_or_init(|| Regex::new(r"<[^>]*>?").ok()) {
        Some(re) => re.replace_all(head, ""),
        None => head.into(),
    };
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(SNIPPET_CHARS).collect()
}

fn browser_client(timeout: Duration) -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    reqwest::Client::builder()
        // Imitujeme prohlížeč kvůli anti-bot ochranám
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

async fn read_response(resp: Result<reqwest::Response, reqwest::Error>) -> FetchOutcome {
    match resp {
        Ok(resp) => {
            let status = Some(resp.status().as_u16());
            match resp.text().await {
                Ok(body) => FetchOutcome::body(status, body),
                Err(e) => FetchOutcome::failed(status, e),
            }
        }
        Err(e) => FetchOutcome::failed(e.status().map(|s| s.as_u16()), e),
    }
}

pub struct DirectFetch {
    client: reqwest::Client,
}

impl DirectFetch {
    pub fn new() -> Self {
        Self { client: browser_client(Duration::from_secs(20)) }
    }
}

impl Default for DirectFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        read_response(self.client.get(url).send().await).await
    }
}

/// Scraping proxy API (`?token=..&url=..`), optionally with JS rendering.
pub struct ProxyFetch {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    render: bool,
}

impl ProxyFetch {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, render: bool) -> Self {
        // Render na straně proxy trvá déle
        let timeout = if render { 60 } else { 30 };
        Self {
            client: browser_client(Duration::from_secs(timeout)),
            endpoint: endpoint.into(),
            token: token.into(),
            render,
        }
    }

    fn request_url(&self, target: &str) -> Result<reqwest::Url, String> {
        let mut params = vec![("token", self.token.as_str()), ("url", target)];
        if self.render {
            params.push(("render", "true"));
        }
        reqwest::Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| format!("invalid proxy endpoint {}: {e}", self.endpoint))
    }
}

#[async_trait]
impl FetchStrategy for ProxyFetch {
    fn name(&self) -> &'static str {
        if self.render {
            "proxy_render"
        } else {
            "proxy"
        }
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.request_url(url) {
            Ok(request_url) => read_response(self.client.get(request_url).send().await).await,
            Err(e) => FetchOutcome::failed(None, e),
        }
    }
}

/// Lokální headless Chrome, poslední záchrana když HTTP i proxy selžou.
pub struct BrowserFetch;

#[async_trait]
impl FetchStrategy for BrowserFetch {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> FetchOutcome {
        let url = url.to_string();
        let result = task::spawn_blocking(move || -> anyhow::Result<String> {
            let options = LaunchOptions::default_builder()
                .headless(true)
                .sandbox(false)
                .build()
                .context("Failed to build Chrome launch options")?;

            let browser = Browser::new(options).context("Failed to launch Chrome")?;
            let tab = browser.new_tab().context("Failed to create browser tab")?;

            tab.navigate_to(&url).context("Chrome navigate failed")?;
            tab.wait_for_element("body").context("Chrome wait_for_element(body) failed")?;
            std::thread::sleep(Duration::from_secs(2));

            tab.get_content().context("Failed to read HTML from browser tab")
        })
        .await;

        match result {
            Ok(Ok(html)) => FetchOutcome::body(None, html),
            Ok(Err(e)) => FetchOutcome::failed(None, format!("{e:#}")),
            Err(e) => FetchOutcome::failed(None, e),
        }
    }
}

/// Proxy / browser settings for building the fallback chain.
#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub proxy_endpoint: String,
    pub proxy_token: Option<String>,
    pub browser: bool,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            proxy_endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
            proxy_token: None,
            browser: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Failed to load hawk.live ({} attempts)", .attempts.len())]
    NoContent { attempts: Vec<FetchAttempt> },
}

/// Result of a run through the strategy chain.
#[derive(Debug, Default)]
pub struct Acquisition {
    pub content: Option<String>,
    pub attempts: Vec<FetchAttempt>,
}

impl Acquisition {
    pub fn into_content(self) -> Result<(String, Vec<FetchAttempt>), AcquireError> {
        match self.content {
            Some(content) => Ok((content, self.attempts)),
            None => Err(AcquireError::NoContent { attempts: self.attempts }),
        }
    }
}

pub struct Acquirer {
    direct: Box<dyn FetchStrategy>,
    fallbacks: Vec<Box<dyn FetchStrategy>>,
}

impl Acquirer {
    pub fn new(direct: Box<dyn FetchStrategy>, fallbacks: Vec<Box<dyn FetchStrategy>>) -> Self {
        Self { direct, fallbacks }
    }

    pub fn from_settings(settings: &FallbackSettings) -> Self {
        let mut fallbacks: Vec<Box<dyn FetchStrategy>> = Vec::new();
        match settings.proxy_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => {
                fallbacks.push(Box::new(ProxyFetch::new(&settings.proxy_endpoint, token, false)));
                fallbacks.push(Box::new(ProxyFetch::new(&settings.proxy_endpoint, token, true)));
            }
            None => debug!("No proxy token configured, proxy strategies disabled"),
        }
        if settings.browser {
            fallbacks.push(Box::new(BrowserFetch));
        }
        Self::new(Box::new(DirectFetch::new()), fallbacks)
    }

    /// Runs the strategy chain over `candidates`, then the optional override.
    pub async fn acquire(
        &self,
        candidates: &[String],
        force_proxy: bool,
        source_override: Option<&str>,
    ) -> Acquisition {
        let mut acq = Acquisition::default();

        if !force_proxy {
            for url in candidates {
                if self.try_strategy(self.direct.as_ref(), url, &mut acq).await {
                    break;
                }
            }
        }

        if acq.content.is_none() {
            if self.fallbacks.is_empty() {
                debug!("No fallback strategies configured");
            }
            'urls: for url in candidates {
                for strategy in &self.fallbacks {
                    if self.try_strategy(strategy.as_ref(), url, &mut acq).await {
                        break 'urls;
                    }
                }
            }
        }

        if let Some(url) = source_override.filter(|u| !u.trim().is_empty()) {
            info!("Using source override {}", url);
            if let Some(body) = self.fetch_override(url, force_proxy, &mut acq.attempts).await {
                acq.content = Some(body);
            }
        }

        acq
    }

    /// Returns true when the body passed `has_usable_data`; the body then
    /// becomes the content.
    async fn try_strategy(
        &self,
        strategy: &dyn FetchStrategy,
        url: &str,
        acq: &mut Acquisition,
    ) -> bool {
        let (attempt, body) = record_attempt(strategy, url).await;
        let matched = attempt.matched;
        acq.attempts.push(attempt);
        if matched {
            acq.content = body;
        }
        matched
    }

    /// Override page (pastes, archived snapshots): any non-empty body wins,
    /// fetched the same way the rest of the run was.
    async fn fetch_override(
        &self,
        url: &str,
        force_proxy: bool,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Option<String> {
        if !force_proxy {
            let (attempt, body) = record_attempt(self.direct.as_ref(), url).await;
            attempts.push(attempt);
            return body;
        }
        for strategy in &self.fallbacks {
            let (attempt, body) = record_attempt(strategy.as_ref(), url).await;
            attempts.push(attempt);
            if body.is_some() {
                return body;
            }
        }
        None
    }
}

async fn record_attempt(strategy: &dyn FetchStrategy, url: &str) -> (FetchAttempt, Option<String>) {
    let outcome = strategy.fetch(url).await;
    let body = outcome.body.filter(|b| !b.is_empty());
    let matched = body.as_deref().map(has_usable_data).unwrap_or(false);
    let byte_count = body.as_ref().map(|b| b.len()).unwrap_or(0);
    let body_snippet = match (&body, matched) {
        (Some(b), false) => body_snippet(b),
        _ => String::new(),
    };

    if matched {
        debug!(strategy = strategy.name(), bytes = byte_count, "{} matched", url);
    } else {
        warn!(
            strategy = strategy.name(),
            status = ?outcome.status,
            bytes = byte_count,
            error = outcome.error.as_deref().unwrap_or(""),
            "{} returned no usable data",
            url
        );
    }

    let attempt = FetchAttempt {
        strategy: strategy.name().to_string(),
        url: url.to_string(),
        http_status: outcome.status,
        error: outcome.error,
        byte_count,
        matched,
        body_snippet,
    };
    (attempt, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Strategie s předpřipravenými odpověďmi podle URL.
    struct Canned {
        name: &'static str,
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(name: &'static str, pages: &[(&str, &str)]) -> Self {
            Self {
                name,
                pages: pages.iter().map(|(u, b)| (u.to_string(), b.to_string())).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FetchStrategy for Canned {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, url: &str) -> FetchOutcome {
            self.calls.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => FetchOutcome::body(Some(200), body.clone()),
                None => FetchOutcome::failed(Some(403), "HTTP 403"),
            }
        }
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const LIVE_PAGE: &str = r#"<div class="series-list__item">live</div>"#;
    const BLOCKED: &str = "<html><body><h1>Just a   moment...</h1>\n<p>Checking your browser</p></body></html>";

    #[tokio::test]
    async fn stops_at_first_matching_url() {
        let direct = Canned::new("direct", &[("u1", BLOCKED), ("u2", "<p>maintenance</p>"), ("u3", LIVE_PAGE)]);
        let acquirer = Acquirer::new(Box::new(direct), vec![]);

        let acq = acquirer.acquire(&urls(&["u1", "u2", "u3"]), false, None).await;

        assert_eq!(acq.attempts.len(), 3);
        assert!(!acq.attempts[0].matched);
        assert_eq!(acq.attempts[0].body_snippet, "Just a moment... Checking your browser");
        assert!(!acq.attempts[1].matched);
        assert_eq!(acq.attempts[1].body_snippet, "maintenance");
        assert!(acq.attempts[2].matched);
        assert!(acq.attempts[2].body_snippet.is_empty());
        assert_eq!(acq.attempts[2].byte_count, LIVE_PAGE.len());
        assert_eq!(acq.content.as_deref(), Some(LIVE_PAGE));
    }

    #[tokio::test]
    async fn falls_back_to_proxy_chain() {
        let direct = Canned::new("direct", &[]);
        let proxy = Canned::new("proxy", &[]);
        let render = Canned::new("proxy_render", &[("u2", r#"<div id="app" data-page="{}"></div>"#)]);
        let acquirer = Acquirer::new(Box::new(direct), vec![Box::new(proxy), Box::new(render)]);

        let acq = acquirer.acquire(&urls(&["u1", "u2"]), false, None).await;

        let trail: Vec<_> = acq.attempts.iter().map(|a| (a.strategy.as_str(), a.url.as_str())).collect();
        assert_eq!(
            trail,
            vec![
                ("direct", "u1"),
                ("direct", "u2"),
                ("proxy", "u1"),
                ("proxy_render", "u1"),
                ("proxy", "u2"),
                ("proxy_render", "u2"),
            ]
        );
        assert_eq!(acq.attempts[0].http_status, Some(403));
        assert!(acq.attempts.last().unwrap().matched);
        assert!(acq.content.is_some());
    }

    #[tokio::test]
    async fn forced_proxy_skips_direct() {
        let direct = Canned::new("direct", &[("u1", LIVE_PAGE)]);
        let proxy = Canned::new("proxy", &[("u1", LIVE_PAGE)]);
        let acquirer = Acquirer::new(Box::new(direct), vec![Box::new(proxy)]);

        let acq = acquirer.acquire(&urls(&["u1"]), true, None).await;

        assert_eq!(acq.attempts.len(), 1);
        assert_eq!(acq.attempts[0].strategy, "proxy");
    }

    #[tokio::test]
    async fn nothing_usable_is_an_acquire_error() {
        let acquirer = Acquirer::new(Box::new(Canned::new("direct", &[("u1", BLOCKED)])), vec![]);
        let acq = acquirer.acquire(&urls(&["u1"]), false, None).await;

        match acq.into_content() {
            Err(AcquireError::NoContent { attempts }) => assert_eq!(attempts.len(), 1),
            Ok(_) => panic!("expected NoContent"),
        }
    }

    #[tokio::test]
    async fn override_replaces_content_with_any_body() {
        let direct = Canned::new("direct", &[("u1", LIVE_PAGE), ("paste", "<p>saved page</p>")]);
        let acquirer = Acquirer::new(Box::new(direct), vec![]);

        let acq = acquirer.acquire(&urls(&["u1"]), false, Some("paste")).await;

        assert_eq!(acq.attempts.len(), 2);
        assert_eq!(acq.content.as_deref(), Some("<p>saved page</p>"));
    }

    #[tokio::test]
    async fn forced_proxy_override_walks_fallback_chain() {
        let direct = Canned::new("direct", &[("paste", "<p>saved page</p>")]);
        let proxy = Canned::new("proxy", &[("u1", LIVE_PAGE)]);
        let render = Canned::new("proxy_render", &[("paste", "<p>rendered paste</p>")]);
        let acquirer = Acquirer::new(Box::new(direct), vec![Box::new(proxy), Box::new(render)]);

        let acq = acquirer.acquire(&urls(&["u1"]), true, Some("paste")).await;

        let trail: Vec<_> = acq.attempts.iter().map(|a| (a.strategy.as_str(), a.url.as_str())).collect();
        assert_eq!(trail, vec![("proxy", "u1"), ("proxy", "paste"), ("proxy_render", "paste")]);
        assert_eq!(acq.content.as_deref(), Some("<p>rendered paste</p>"));
    }

    #[test]
    fn usable_data_markers() {
        assert!(has_usable_data(LIVE_PAGE));
        assert!(has_usable_data(r#"<div id="app" data-page="{&quot;x&quot;:1}">"#));
        assert!(has_usable_data(r#"<div id="app"></div><script>SeriesListView</script>"#));
        assert!(!has_usable_data(r#"<div id="app"></div>"#));
        assert!(!has_usable_data(BLOCKED));
    }

    #[test]
    fn snippet_is_bounded_and_tag_free() {
        let long = format!("<div>{}</div>", "word ".repeat(400));
        let s = body_snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_CHARS);
        assert!(!s.contains('<'));

        // Řez uprostřed tagu nesmí nechat jeho zbytek
        let s = body_snippet(&format!("{}<span class=\"x\"", "a".repeat(990)));
        assert!(!s.contains("span"));
    }
}
