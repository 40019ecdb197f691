use super::{FetchError, Fetcher};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Plain HTTP backend for pages that render without client-side scripts.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport { url: String::new(), source })?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let request = async {
            let resp = self.client.get(url.clone()).send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(done)) => done,
            Ok(Err(source)) if source.is_timeout() => {
                return Err(FetchError::Timeout { url: url.to_string(), after: self.timeout })
            }
            Ok(Err(source)) => return Err(FetchError::Transport { url: url.to_string(), source }),
            Err(_) => return Err(FetchError::Timeout { url: url.to_string(), after: self.timeout }),
        };
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }
        tracing::debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }
}
