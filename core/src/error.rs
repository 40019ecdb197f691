//! Errors raised while reading or writing the persisted corpus and index.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("token {token:?} posts doc {doc_id} but the corpus holds {num_docs} publications")]
    DanglingPosting { token: String, doc_id: u32, num_docs: usize },

    #[error("index was built against corpus {expected} but the corpus on disk is {actual}; rebuild the index")]
    StaleIndex { expected: String, actual: String },
}
