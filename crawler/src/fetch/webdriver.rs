//! W3C WebDriver backend (chromedriver and compatible servers).
//!
//! One browser session is opened by [`WebDriverFetcher::connect`] and reused
//! for every fetch. A fetch navigates, waits `settle` so client-side rendering
//! can finish, then returns the page source.

use super::{FetchError, Fetcher, DEFAULT_USER_AGENT};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server endpoint, e.g. `http://localhost:9515`.
    pub endpoint: Url,
    pub user_agent: String,
    pub headless: bool,
    pub settle: Duration,
    pub timeout: Duration,
}

impl WebDriverConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headless: true,
            settle: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }

    /// Session capabilities: headless Chrome with automation fingerprints suppressed.
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-extensions".to_string(),
            "--disable-infobars".to_string(),
            "--window-size=1920,1080".to_string(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless=new".to_string());
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": "normal",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                        "useAutomationExtension": false,
                    }
                }
            }
        })
    }
}

pub struct WebDriverFetcher {
    client: Client,
    session: Url,
    settle: Duration,
    timeout: Duration,
}

impl WebDriverFetcher {
    /// Start a browser session. Failure here means the automation environment is unusable.
    pub async fn connect(config: &WebDriverConfig) -> Result<Self, FetchError> {
        Self::start(config).await.map_err(|e| FetchError::DriverInit {
            endpoint: config.endpoint.to_string(),
            source: Box::new(e),
        })
    }

    async fn start(config: &WebDriverConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|source| FetchError::Transport { url: config.endpoint.to_string(), source })?;
        let base = with_trailing_slash(&config.endpoint);
        let new_session = base.join("session").map_err(|_| FetchError::InvalidUrl(base.to_string()))?;

        let value = command(&client, Method::POST, &new_session, Some(config.capabilities()), config.timeout).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::WebDriver {
                command: "new session".into(),
                error: "protocol error".into(),
                message: "response carried no sessionId".into(),
            })?;
        let session = base
            .join(&format!("session/{session_id}/"))
            .map_err(|_| FetchError::InvalidUrl(session_id.to_string()))?;
        tracing::info!(session = session_id, endpoint = %config.endpoint, "browser session started");

        let fetcher = Self { client, session, settle: config.settle, timeout: config.timeout };
        let page_load_ms = config.timeout.as_millis() as u64;
        fetcher.call(Method::POST, "timeouts", Some(json!({ "pageLoad": page_load_ms }))).await?;
        Ok(fetcher)
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        let url = self.session.join(path).map_err(|_| FetchError::InvalidUrl(path.to_string()))?;
        command(&self.client, method, &url, body, self.timeout).await
    }

    /// End the browser session.
    pub async fn close(self) -> Result<(), FetchError> {
        let url = self.session.as_str().trim_end_matches('/').to_string();
        let url = Url::parse(&url).map_err(|_| FetchError::InvalidUrl(url))?;
        command(&self.client, Method::DELETE, &url, None, self.timeout).await?;
        tracing::info!("browser session closed");
        Ok(())
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.call(Method::POST, "url", Some(json!({ "url": url.as_str() }))).await?;
        sleep(self.settle).await;
        let source = self.call(Method::GET, "source", None).await?;
        match source {
            Value::String(html) => {
                tracing::debug!(%url, bytes = html.len(), "rendered");
                Ok(html)
            }
            other => Err(FetchError::WebDriver {
                command: "get page source".into(),
                error: "protocol error".into(),
                message: format!("expected a string, got {other}"),
            }),
        }
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Issue one WebDriver command and unwrap the `value` member of the reply.
async fn command(client: &Client, method: Method, url: &Url, body: Option<Value>, timeout: Duration) -> Result<Value, FetchError> {
    let name = format!("{method} {}", url.path());
    let mut request = client.request(method, url.clone());
    if let Some(body) = body {
        request = request.json(&body);
    }
    let send = async {
        let resp = request.send().await?;
        resp.json::<Value>().await
    };
    let reply = match tokio::time::timeout(timeout, send).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(source)) => return Err(FetchError::Transport { url: url.to_string(), source }),
        Err(_) => return Err(FetchError::Timeout { url: url.to_string(), after: timeout }),
    };
    parse_reply(&name, reply)
}

fn parse_reply(command: &str, mut reply: Value) -> Result<Value, FetchError> {
    let value = reply.get_mut("value").map(Value::take).unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
        return Err(FetchError::WebDriver { command: command.to_string(), error: error.to_string(), message: message.to_string() });
    }
    Ok(value)
}
