//! Sequential crawl of the staff listing and each author's publications.

use crate::checkpoint::Checkpoint;
use crate::extract::{extract_authors, extract_publications};
use crate::fetch::{FetchError, Fetcher, RetryPolicy, RetryingFetcher};
use crate::politeness::{get_crawl_delay, PoliteFetcher};
use anyhow::{Context, Result};
use pubsearch_core::persist::{save_corpus, DataPaths};
use pubsearch_core::{Author, Publication};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use url::Url;

/// Staff listing of the School of Economics, Finance and Accounting.
pub const DEFAULT_PERSONS_PATH: &str = "en/organisations/fbl-school-of-economics-finance-and-accounting/persons/";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub base_url: Url,
    /// Listing path relative to `base_url`; pages are selected with `?page=N`.
    pub persons_path: String,
    /// Safety cap on listing pages; `None` walks until an empty page.
    pub max_pages: Option<u32>,
    pub retry: RetryPolicy,
    /// Continue from `crawl_checkpoint.json` when it belongs to the same site.
    pub resume: bool,
}

impl CrawlConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            persons_path: DEFAULT_PERSONS_PATH.to_string(),
            max_pages: None,
            retry: RetryPolicy::default(),
            resume: true,
        }
    }

    pub fn listing_url(&self, page: u32) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&self.persons_path)
            .with_context(|| format!("invalid persons path {}", self.persons_path))?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    pub fn publications_url(profile_link: &str) -> Result<Url> {
        let url = format!("{}/publications", profile_link.trim_end_matches('/'));
        Url::parse(&url).with_context(|| format!("invalid profile link {profile_link}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub listing_pages: u32,
    pub authors: usize,
    pub skipped_authors: usize,
    pub failed_authors: usize,
    pub publications: usize,
    pub skipped_publications: usize,
    pub duplicate_publications: usize,
}

/// Lazy walk over the paginated staff listing.
///
/// Each call to [`AuthorPages::next_page`] fetches one listing page. The walk
/// ends on a page without entries, on a page that only repeats authors already
/// seen, or at the configured page cap.
pub struct AuthorPages<'a, F: ?Sized> {
    fetcher: &'a F,
    config: &'a CrawlConfig,
    page: u32,
    done: bool,
    seen: HashSet<String>,
}

impl<'a, F: Fetcher + ?Sized> AuthorPages<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a CrawlConfig) -> Self {
        Self { fetcher, config, page: 0, done: false, seen: HashSet::new() }
    }

    pub fn pages_fetched(&self) -> u32 { self.page }

    /// New authors of the next listing page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self, stats: &mut CrawlStats) -> Result<Option<Vec<Author>>> {
        if self.done || self.config.max_pages.is_some_and(|max| self.page >= max) {
            return Ok(None);
        }
        let url = self.config.listing_url(self.page)?;
        tracing::info!(page = self.page + 1, %url, "fetching author listing");
        let html = self.fetcher.fetch(&url).await.with_context(|| format!("author listing {url}"))?;
        let extracted = extract_authors(&html, &url);
        self.page += 1;
        stats.listing_pages += 1;
        stats.skipped_authors += extracted.skipped;

        if extracted.is_empty_page() {
            tracing::info!(page = self.page, "empty listing page, author listing exhausted");
            self.done = true;
            return Ok(None);
        }
        let fresh: Vec<Author> = extracted
            .items
            .into_iter()
            .filter(|a| self.seen.insert(a.profile_link.clone()))
            .collect();
        if fresh.is_empty() && extracted.skipped < extracted.entries {
            tracing::warn!(page = self.page, "listing page repeats known authors, stopping pagination");
            self.done = true;
            return Ok(None);
        }
        for author in &fresh {
            tracing::debug!(name = %author.name, "found author");
        }
        stats.authors += fresh.len();
        Ok(Some(fresh))
    }
}

/// Publications of one author; `Ok(None)` when the page is permanently unavailable.
async fn author_publications<F: Fetcher + ?Sized>(fetcher: &F, author: &Author, stats: &mut CrawlStats) -> Result<Option<Vec<Publication>>> {
    let url = CrawlConfig::publications_url(&author.profile_link)?;
    tracing::info!(author = %author.name, %url, "crawling publications");
    let html = match fetcher.fetch(&url).await {
        Ok(html) => html,
        Err(e @ FetchError::Status { .. }) if !e.is_transient() => {
            tracing::warn!(author = %author.name, error = %e, "publication page unavailable, skipping author");
            stats.failed_authors += 1;
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("publications of {}", author.name)),
    };
    let extracted = extract_publications(&html, &url);
    stats.skipped_publications += extracted.skipped;
    tracing::info!(author = %author.name, found = extracted.items.len(), skipped = extracted.skipped, "parsed publications");
    Ok(Some(extracted.items))
}

/// Keep the first record of every publication link; co-authored papers appear under each author.
fn dedup_by_link(publications: Vec<Publication>, stats: &mut CrawlStats) -> Vec<Publication> {
    let mut seen = HashSet::new();
    let before = publications.len();
    let unique: Vec<Publication> = publications.into_iter().filter(|p| seen.insert(p.link.clone())).collect();
    stats.duplicate_publications = before - unique.len();
    unique
}

/// Crawl the portal and replace the persisted corpus with the result.
///
/// The crawl delay is read from robots.txt first; every later request waits
/// for it and transient failures are retried per `config.retry`. Progress is
/// checkpointed after each author, and the corpus file is only written once
/// every author has been processed.
pub async fn crawl<F: Fetcher>(fetcher: F, config: &CrawlConfig, paths: &DataPaths) -> Result<(Vec<Publication>, CrawlStats)> {
    let delay = get_crawl_delay(&fetcher, &config.base_url).await;
    let polite = PoliteFetcher::new(fetcher, Duration::from_secs(delay)).after_request(Instant::now());
    let fetcher = RetryingFetcher::new(polite, config.retry);

    let mut checkpoint = if config.resume {
        Checkpoint::resume(paths, config.base_url.as_str())?
    } else {
        Checkpoint::new(config.base_url.as_str())
    };
    let mut stats = CrawlStats::default();
    let mut pages = AuthorPages::new(&fetcher, config);

    while let Some(authors) = pages.next_page(&mut stats).await? {
        for author in authors {
            if checkpoint.is_completed(&author.profile_link) {
                tracing::debug!(author = %author.name, "already crawled, skipping");
                continue;
            }
            if let Some(found) = author_publications(&fetcher, &author, &mut stats).await? {
                checkpoint.record_author(&author.profile_link, found);
                checkpoint.save(paths).context("writing crawl checkpoint")?;
            }
        }
    }
    tracing::info!(pages = pages.pages_fetched(), authors = stats.authors, "author listing done");

    let publications = dedup_by_link(std::mem::take(&mut checkpoint.publications), &mut stats);
    stats.publications = publications.len();
    save_corpus(paths, &publications).context("saving corpus")?;
    Checkpoint::clear(paths)?;
    tracing::info!(?stats, "crawl complete");
    Ok((publications, stats))
}
