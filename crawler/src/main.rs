use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pubsearch_core::persist::{rebuild_index, DataPaths};
use pubsearch_crawler::crawl::{crawl, CrawlConfig, DEFAULT_PERSONS_PATH};
use pubsearch_crawler::fetch::{HttpFetcher, RetryPolicy, WebDriverConfig, WebDriverFetcher, DEFAULT_USER_AGENT};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Render pages in a browser driven over WebDriver
    Webdriver,
    /// Plain HTTP GET, for pages that need no client-side rendering
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "pubsearch-crawler")]
#[command(about = "Crawl staff publications from the research portal, then build the title index")]
struct Cli {
    /// Portal root URL
    #[arg(long, default_value = "https://pureportal.coventry.ac.uk/")]
    base_url: String,
    /// Directory holding publications.json, inverted_index.json and meta.json
    #[arg(long, default_value = "./data")]
    data_dir: String,
    /// Staff listing path relative to the base URL
    #[arg(long, default_value = DEFAULT_PERSONS_PATH)]
    persons_path: String,
    #[arg(long, value_enum, default_value_t = Backend::Webdriver)]
    backend: Backend,
    /// WebDriver server (e.g. chromedriver --port=9515)
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// Seconds to let client-side rendering settle after each navigation
    #[arg(long, default_value_t = 10)]
    settle_secs: u64,
    /// Per-request timeout in seconds [default: 60 for webdriver, 30 for http]
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Attempts per request before the crawl is aborted
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
    /// Stop after this many listing pages even if more exist
    #[arg(long)]
    max_pages: Option<u32>,
    /// Ignore any checkpoint left by an interrupted crawl
    #[arg(long, default_value_t = false)]
    fresh: bool,
    /// Only crawl; leave the index untouched
    #[arg(long, default_value_t = false)]
    skip_index: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let base_url = Url::parse(&args.base_url).context("invalid --base-url")?;
    let paths = DataPaths::new(&args.data_dir);
    let config = CrawlConfig {
        base_url,
        persons_path: args.persons_path.clone(),
        max_pages: args.max_pages,
        retry: RetryPolicy { max_attempts: args.max_attempts, ..RetryPolicy::default() },
        resume: !args.fresh,
    };
    tracing::info!(base_url = %config.base_url, backend = ?args.backend, data_dir = %args.data_dir, "starting crawl");

    let publications = match args.backend {
        Backend::Webdriver => {
            let endpoint = Url::parse(&args.webdriver_url).context("invalid --webdriver-url")?;
            let wd = WebDriverConfig {
                user_agent: args.user_agent.clone(),
                settle: Duration::from_secs(args.settle_secs),
                timeout: Duration::from_secs(args.timeout_secs.unwrap_or(60)),
                ..WebDriverConfig::new(endpoint)
            };
            let driver = WebDriverFetcher::connect(&wd).await.context("failed to start the browser session")?;
            let result = crawl(&driver, &config, &paths).await;
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "failed to close browser session");
            }
            result?.0
        }
        Backend::Http => {
            let http = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs.unwrap_or(30)))?;
            crawl(http, &config, &paths).await?.0
        }
    };
    tracing::info!(publications = publications.len(), "corpus saved");

    if !args.skip_index {
        if let Some((_, meta)) = rebuild_index(&paths)? {
            tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, "index rebuilt");
        }
    }
    Ok(())
}
