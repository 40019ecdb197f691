pub mod error;
pub mod index;
pub mod lemmatizer;
pub mod persist;
pub mod rank;
pub mod search;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

pub use error::StoreError;
pub use index::{build_index, InvertedIndex};
pub use search::{SearchEngine, SearchHit, SearchOutcome};

pub type DocId = u32;

/// Placeholder written for optional publication fields that the portal did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub profile_link: String,
}

/// One persisted publication. Its doc id is its position in the corpus, not a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub publication_year: String,
    #[serde(default, with = "sentinel")]
    pub journal: Option<String>,
    #[serde(default, with = "sentinel")]
    pub volume: Option<String>,
    pub link: String,
}

/// Optional strings travel as `"N/A"` on disk so consumers never see a missing key.
mod sentinel {
    use super::NOT_AVAILABLE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(NOT_AVAILABLE))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|v| v != NOT_AVAILABLE))
    }
}
