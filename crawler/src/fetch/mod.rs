//! Page fetching.
//!
//! [`Fetcher`] turns a URL into the rendered document text. Backends:
//! [`WebDriverFetcher`] drives one reused browser session for script-rendered
//! pages, [`HttpFetcher`] issues plain GETs. [`RetryingFetcher`] and
//! [`crate::politeness::PoliteFetcher`] decorate any backend.

mod http;
mod retry;
mod webdriver;

pub use http::HttpFetcher;
pub use retry::{RetryPolicy, RetryingFetcher};
pub use webdriver::{WebDriverConfig, WebDriverFetcher};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Realistic desktop browser user-agent presented by both backends.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("webdriver {command} failed: {error}: {message}")]
    WebDriver { command: String, error: String, message: String },

    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("could not start a browser session at {endpoint}: {source}")]
    DriverInit {
        endpoint: String,
        #[source]
        source: Box<FetchError>,
    },

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether a later attempt at the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Transport { .. } | FetchError::WebDriver { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::InvalidUrl(_) | FetchError::DriverInit { .. } | FetchError::RetriesExhausted { .. } => false,
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[async_trait]
impl<'a, F: Fetcher + ?Sized> Fetcher for &'a F {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let url = "https://portal.example/".to_string();
        assert!(FetchError::Timeout { url: url.clone(), after: Duration::from_secs(1) }.is_transient());
        assert!(FetchError::Status { url: url.clone(), status: 503 }.is_transient());
        assert!(FetchError::Status { url: url.clone(), status: 429 }.is_transient());
        assert!(!FetchError::Status { url: url.clone(), status: 404 }.is_transient());
        assert!(!FetchError::InvalidUrl(url).is_transient());
    }
}
