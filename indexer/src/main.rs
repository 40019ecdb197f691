use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pubsearch_core::persist::{load_meta, rebuild_index, try_load_corpus, try_load_index, DataPaths};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pubsearch-indexer")]
#[command(about = "Build and check the publication title index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild inverted_index.json and meta.json from publications.json
    Build {
        /// Data directory written by the crawler
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
    /// Check that the index matches the corpus it claims to be built from
    Verify {
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { data_dir } => build(&DataPaths::new(data_dir)),
        Commands::Verify { data_dir } => {
            let report = verify(&DataPaths::new(data_dir))?;
            tracing::info!(num_docs = report.num_docs, num_terms = report.num_terms, num_postings = report.num_postings, "index verified");
            Ok(())
        }
    }
}

fn build(paths: &DataPaths) -> Result<()> {
    match rebuild_index(paths).context("building index")? {
        Some((_, meta)) => {
            tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, corpus = %meta.corpus_sha1, "index build complete");
            Ok(())
        }
        None => bail!("no corpus at {}; run the crawler first", paths.corpus().display()),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct VerifyReport {
    num_docs: usize,
    num_terms: usize,
    num_postings: usize,
}

fn verify(paths: &DataPaths) -> Result<VerifyReport> {
    let Some(corpus) = try_load_corpus(paths)? else {
        bail!("no corpus at {}; run the crawler first", paths.corpus().display())
    };
    let Some(index) = try_load_index(paths)? else {
        bail!("no index at {}; run `pubsearch-indexer build` first", paths.index().display())
    };
    match load_meta(paths)? {
        Some(meta) if meta.corpus_sha1 != corpus.fingerprint => {
            bail!("index was built against corpus {} but the corpus is {}", meta.corpus_sha1, corpus.fingerprint)
        }
        Some(meta) if meta.num_docs as usize != corpus.publications.len() => {
            bail!("manifest records {} documents, corpus holds {}", meta.num_docs, corpus.publications.len())
        }
        Some(_) => {}
        None => tracing::warn!("no manifest; skipping fingerprint check"),
    }
    index.check_bounds(corpus.publications.len())?;
    let mismatched = index.mismatched_postings(&corpus.publications);
    if let Some((term, doc_id)) = mismatched.first() {
        bail!("{} postings disagree with their titles, first: {term:?} in doc {doc_id}", mismatched.len());
    }
    Ok(VerifyReport {
        num_docs: corpus.publications.len(),
        num_terms: index.num_terms(),
        num_postings: index.terms().map(|(_, p)| p.len()).sum(),
    })
}
