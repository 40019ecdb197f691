use crate::error::{Result, StoreError};
use crate::index::{build_index, InvertedIndex};
use crate::Publication;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fs::{self, create_dir_all};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const META_VERSION: u32 = 1;

/// Manifest written next to the index, tying it to the corpus snapshot it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub corpus_sha1: String,
}

/// A loaded corpus together with the fingerprint of the bytes it was read from.
#[derive(Debug, Clone)]
pub struct CorpusSnapshot {
    pub publications: Vec<Publication>,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("publications.json") }
    pub fn index(&self) -> PathBuf { self.root.join("inverted_index.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn checkpoint(&self) -> PathBuf { self.root.join("crawl_checkpoint.json") }
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Replace `path` with `bytes` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read `path`, returning `None` when it does not exist.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Json { path: path.to_path_buf(), source })
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|source| StoreError::Json { path: path.to_path_buf(), source })?;
    write_atomic(path, &bytes)?;
    Ok(bytes)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_optional(path)? {
        Some(bytes) => parse(path, &bytes).map(Some),
        None => Ok(None),
    }
}

/// Overwrite the corpus with `publications` and return the new snapshot's fingerprint.
pub fn save_corpus(paths: &DataPaths, publications: &[Publication]) -> Result<String> {
    let bytes = write_json(&paths.corpus(), publications)?;
    tracing::info!(path = %paths.corpus().display(), num_docs = publications.len(), "saved corpus");
    Ok(fingerprint(&bytes))
}

pub fn try_load_corpus(paths: &DataPaths) -> Result<Option<CorpusSnapshot>> {
    let path = paths.corpus();
    let Some(bytes) = read_optional(&path)? else { return Ok(None) };
    let publications = parse(&path, &bytes)?;
    Ok(Some(CorpusSnapshot { publications, fingerprint: fingerprint(&bytes) }))
}

/// Load the corpus; a missing file is the empty corpus.
pub fn load_corpus(paths: &DataPaths) -> Result<Vec<Publication>> {
    match try_load_corpus(paths)? {
        Some(snapshot) => Ok(snapshot.publications),
        None => {
            tracing::warn!(path = %paths.corpus().display(), "no existing data found; run the crawler first");
            Ok(Vec::new())
        }
    }
}

/// Write the index and its manifest; the manifest records which corpus it belongs to.
pub fn save_index(paths: &DataPaths, index: &InvertedIndex, num_docs: usize, corpus_sha1: &str) -> Result<MetaFile> {
    write_json(&paths.index(), index)?;
    let meta = MetaFile {
        version: META_VERSION,
        num_docs: num_docs as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        corpus_sha1: corpus_sha1.to_string(),
    };
    write_json(&paths.meta(), &meta)?;
    tracing::info!(path = %paths.index().display(), num_terms = meta.num_terms, "saved index");
    Ok(meta)
}

pub fn try_load_index(paths: &DataPaths) -> Result<Option<InvertedIndex>> {
    read_json(&paths.index())
}

pub fn load_index(paths: &DataPaths) -> Result<InvertedIndex> {
    match try_load_index(paths)? {
        Some(index) => Ok(index),
        None => {
            tracing::warn!(path = %paths.index().display(), "no existing index found; build the index first");
            Ok(InvertedIndex::new())
        }
    }
}

pub fn load_meta(paths: &DataPaths) -> Result<Option<MetaFile>> {
    read_json(&paths.meta())
}

/// Rebuild the index from the persisted corpus and save it. `None` when there is no corpus yet.
pub fn rebuild_index(paths: &DataPaths) -> Result<Option<(InvertedIndex, MetaFile)>> {
    let Some(snapshot) = try_load_corpus(paths)? else { return Ok(None) };
    let index = build_index(&snapshot.publications);
    let meta = save_index(paths, &index, snapshot.publications.len(), &snapshot.fingerprint)?;
    Ok(Some((index, meta)))
}
