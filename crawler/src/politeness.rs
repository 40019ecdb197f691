//! Crawl-delay discovery and request throttling.

use crate::fetch::{FetchError, Fetcher};
use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::Html;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use url::Url;

/// Delay used when the site publishes no usable crawl-delay.
pub const DEFAULT_CRAWL_DELAY_SECS: u64 = 2;

/// Upper bound on an advertised crawl-delay; larger values are clamped to it.
pub const MAX_CRAWL_DELAY_SECS: u64 = 300;

/// Extract the crawl delay in whole seconds from a robots file.
///
/// The `User-agent: *` group wins; otherwise the first crawl-delay anywhere in
/// the file is used. Fractional values round up.
pub fn parse_crawl_delay(robots: &str) -> Option<u64> {
    let mut active = false;
    let mut in_agent_line = false;
    let mut wildcard: Option<u64> = None;
    let mut first: Option<u64> = None;
    for line in robots.lines() {
        let l = line.split('#').next().unwrap_or_default().trim();
        if l.is_empty() { continue; }
        let Some((k, v)) = l.split_once(':') else { continue };
        let key = k.trim().to_lowercase();
        let val = v.trim();
        match key.as_str() {
            "user-agent" => {
                // consecutive user-agent lines share one group
                active = (in_agent_line && active) || val == "*";
                in_agent_line = true;
                continue;
            }
            "crawl-delay" => {
                if let Some(secs) = parse_seconds(val) {
                    first.get_or_insert(secs);
                    if active && wildcard.is_none() {
                        wildcard = Some(secs);
                    }
                }
            }
            _ => {}
        }
        in_agent_line = false;
    }
    wildcard.or(first)
}

fn parse_seconds(val: &str) -> Option<u64> {
    let n: f64 = val.parse().ok()?;
    if n.is_nan() || n < 0.0 {
        return None;
    }
    if n > MAX_CRAWL_DELAY_SECS as f64 {
        tracing::warn!(advertised = val, max_secs = MAX_CRAWL_DELAY_SECS, "crawl-delay too large, clamping");
        return Some(MAX_CRAWL_DELAY_SECS);
    }
    Some(n.ceil() as u64)
}

/// Browsers wrap plain-text responses in markup; reduce them back to text.
fn robots_text(body: &str) -> String {
    if body.trim_start().starts_with('<') {
        Html::parse_document(body).root_element().text().collect()
    } else {
        body.to_string()
    }
}

/// Read the site's crawl delay through `fetcher`, falling back to the default
/// when robots.txt is unreachable or has no usable directive.
pub async fn get_crawl_delay<F: Fetcher + ?Sized>(fetcher: &F, base_url: &Url) -> u64 {
    let robots_url = match base_url.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return DEFAULT_CRAWL_DELAY_SECS,
    };
    let delay = match fetcher.fetch(&robots_url).await {
        Ok(body) => parse_crawl_delay(&robots_text(&body)).unwrap_or(DEFAULT_CRAWL_DELAY_SECS),
        Err(e) => {
            tracing::warn!(url = %robots_url, error = %e, "robots.txt unavailable, using default crawl delay");
            DEFAULT_CRAWL_DELAY_SECS
        }
    };
    tracing::info!(delay_secs = delay, "crawl delay set");
    delay
}

/// Enforces a minimum gap between the starts of consecutive requests.
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: Mutex::new(None) }
    }

    pub fn delay(&self) -> Duration { self.delay }

    /// Count a request made outside the throttle, started at `at`.
    pub fn mark(&self, at: Instant) {
        *self.last.lock() = Some(at);
    }

    /// Sleep until `delay` has passed since the previous call, then claim the slot.
    pub async fn wait(&self) {
        loop {
            let pause = {
                let mut last = self.last.lock();
                let now = Instant::now();
                match *last {
                    Some(prev) if now.duration_since(prev) < self.delay => self.delay - now.duration_since(prev),
                    _ => {
                        *last = Some(now);
                        return;
                    }
                }
            };
            sleep(pause).await;
        }
    }
}

/// Fetcher decorator that pauses for the crawl delay before every request.
pub struct PoliteFetcher<F> {
    inner: F,
    throttle: Throttle,
}

impl<F: Fetcher> PoliteFetcher<F> {
    pub fn new(inner: F, delay: Duration) -> Self {
        Self { inner, throttle: Throttle::new(delay) }
    }

    /// The next request waits out the delay from `at`, e.g. the robots.txt fetch.
    pub fn after_request(self, at: Instant) -> Self {
        self.throttle.mark(at);
        self
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for PoliteFetcher<F> {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.throttle.wait().await;
        self.inner.fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Static(Result<&'static str, u16>);

    #[async_trait]
    impl Fetcher for Static {
        async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            match self.0 {
                Ok(body) => Ok(body.to_string()),
                Err(status) => Err(FetchError::Status { url: url.to_string(), status }),
            }
        }
    }

    #[test]
    fn wildcard_group_wins() {
        let robots = "User-agent: googlebot\nCrawl-delay: 1\n\nUser-agent: *\nDisallow: /admin\nCrawl-delay: 5\n";
        assert_eq!(parse_crawl_delay(robots), Some(5));
    }

    #[test]
    fn shared_group_lines() {
        let robots = "User-agent: bingbot\nUser-agent: *\nCrawl-delay: 7\n";
        assert_eq!(parse_crawl_delay(robots), Some(7));
    }

    #[test]
    fn falls_back_to_any_group_and_rounds_up() {
        assert_eq!(parse_crawl_delay("User-agent: slurp\ncrawl-delay: 1.5"), Some(2));
    }

    #[test]
    fn unusable_values_are_ignored() {
        assert_eq!(parse_crawl_delay("User-agent: *\nCrawl-delay: soon\n"), None);
        assert_eq!(parse_crawl_delay("User-agent: *\nCrawl-delay: -3\n"), None);
        assert_eq!(parse_crawl_delay("User-agent: *\nDisallow:\n"), None);
    }

    #[test]
    fn huge_delays_are_clamped() {
        assert_eq!(parse_crawl_delay("User-agent: *\nCrawl-delay: 1e300\n"), Some(MAX_CRAWL_DELAY_SECS));
        assert_eq!(parse_crawl_delay("User-agent: *\nCrawl-delay: inf\n"), Some(MAX_CRAWL_DELAY_SECS));
        assert_eq!(parse_crawl_delay("User-agent: *\nCrawl-delay: 300\n"), Some(300));
    }

    #[test]
    fn browser_wrapped_robots_are_unwrapped() {
        let wrapped = "<html><head></head><body><pre>User-agent: *\nCrawl-delay: 4\n</pre></body></html>";
        assert_eq!(parse_crawl_delay(&robots_text(wrapped)), Some(4));
    }

    #[tokio::test]
    async fn crawl_delay_defaults_when_robots_missing() {
        let base = Url::parse("https://portal.example/").unwrap();
        assert_eq!(get_crawl_delay(&Static(Err(404)), &base).await, DEFAULT_CRAWL_DELAY_SECS);
        assert_eq!(get_crawl_delay(&Static(Ok("User-agent: *\n")), &base).await, DEFAULT_CRAWL_DELAY_SECS);
        assert_eq!(get_crawl_delay(&Static(Ok("User-agent: *\nCrawl-delay: 9")), &base).await, 9);
    }

    #[tokio::test]
    async fn polite_fetcher_spaces_requests() {
        let delay = Duration::from_millis(40);
        let fetcher = PoliteFetcher::new(Static(Ok("ok")), delay);
        let url = Url::parse("https://portal.example/a").unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            fetcher.fetch(&url).await.unwrap();
        }
        assert!(start.elapsed() >= delay * 2);
    }

    #[tokio::test]
    async fn marked_request_delays_the_first_fetch() {
        let delay = Duration::from_millis(40);
        let earlier = Instant::now();
        let fetcher = PoliteFetcher::new(Static(Ok("ok")), delay).after_request(earlier);
        fetcher.fetch(&Url::parse("https://portal.example/a").unwrap()).await.unwrap();
        assert!(earlier.elapsed() >= delay);
    }
}
