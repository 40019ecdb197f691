use pubsearch_core::persist::{read_json, write_json, DataPaths};
use pubsearch_core::{Publication, StoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;

/// Progress of an unfinished crawl, written after each author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub base_url: String,
    pub completed_authors: Vec<String>,
    pub publications: Vec<Publication>,
}

impl Checkpoint {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.to_string(), ..Self::default() }
    }

    /// Resume a previous crawl of `base_url`, or start over when there is none.
    pub fn resume(paths: &DataPaths, base_url: &str) -> Result<Self, StoreError> {
        match read_json::<Checkpoint>(&paths.checkpoint())? {
            Some(cp) if cp.base_url == base_url => {
                tracing::info!(
                    completed = cp.completed_authors.len(),
                    publications = cp.publications.len(),
                    "resuming crawl from checkpoint"
                );
                Ok(cp)
            }
            Some(cp) => {
                tracing::warn!(previous = %cp.base_url, "checkpoint belongs to another site, starting fresh");
                Ok(Self::new(base_url))
            }
            None => Ok(Self::new(base_url)),
        }
    }

    pub fn is_completed(&self, profile_link: &str) -> bool {
        self.completed_authors.iter().any(|a| a == profile_link)
    }

    pub fn record_author(&mut self, profile_link: &str, publications: Vec<Publication>) {
        self.completed_authors.push(profile_link.to_string());
        self.publications.extend(publications);
    }

    pub fn save(&self, paths: &DataPaths) -> Result<(), StoreError> {
        write_json(&paths.checkpoint(), self)?;
        Ok(())
    }

    pub fn clear(paths: &DataPaths) -> Result<(), StoreError> {
        match fs::remove_file(paths.checkpoint()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resume_only_for_same_site() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let mut cp = Checkpoint::new("https://portal.example/");
        cp.record_author("https://portal.example/en/persons/a", vec![]);
        cp.save(&paths).unwrap();

        let same = Checkpoint::resume(&paths, "https://portal.example/").unwrap();
        assert_eq!(same, cp);
        assert!(same.is_completed("https://portal.example/en/persons/a"));

        let other = Checkpoint::resume(&paths, "https://other.example/").unwrap();
        assert!(other.completed_authors.is_empty());

        Checkpoint::clear(&paths).unwrap();
        Checkpoint::clear(&paths).unwrap();
        assert!(Checkpoint::resume(&paths, "https://portal.example/").unwrap().completed_authors.is_empty());
    }
}
