//! SeqXRef Ingest Library
//!
//! Fetching, parsing and normalizing UniProt cross-reference data for
//! macromolecular structure annotation.
//!
//! # Modules
//!
//! - **alignment**: entity/database sequence alignments and overlap grouping
//! - **uniprot**: entry XML parsing, batch fetching, ID mapping lookups and
//!   exchange-format rendering
//! - **download**: streaming bulk file downloads
//!
//! # Example
//!
//! ```no_run
//! use seqxref_ingest::uniprot::{FetchOptions, UniProtConfig, UniProtFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut fetcher = UniProtFetcher::new(UniProtConfig::from_env())?;
//!     let ids = vec!["P69905".to_string(), "P42284-3".to_string()];
//!     let (reference, matches) = fetcher.fetch_list(&ids, FetchOptions::default()).await?;
//!     println!("{} records, {} unmatched", reference.len(), matches.unmatched().len());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod alignment;
pub mod download;
pub mod uniprot;
