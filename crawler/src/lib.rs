//! Crawl phase: politeness-aware fetching of the research portal and
//! structural extraction of staff publication records.

pub mod checkpoint;
pub mod crawl;
pub mod extract;
pub mod fetch;
pub mod politeness;

pub use crawl::{crawl, CrawlConfig, CrawlStats};
pub use fetch::{FetchError, Fetcher};
