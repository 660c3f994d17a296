//! UniProt cross-reference provider
//!
//! Entries are requested in chunks from the UniProt REST service, with the
//! EBI Proteins API as fallback, parsed from UniProt XML into
//! [`EntryRecord`]s (including registered isoform variants) and indexed
//! against the requested identifiers.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod fasta;
pub mod fetch;
pub mod lookup;
pub mod matching;
pub mod models;
pub mod reader;
pub mod sequence;
pub mod xml;

pub use cache::ReferenceCache;
pub use client::UniProtClient;
pub use config::UniProtConfig;
pub use error::{Result, UniProtError};
pub use exchange::{reformat, ExchangeRecord, EXCHANGE_FORMAT};
pub use fetch::{FetchOptions, FetchReport, UniProtFetcher};
pub use lookup::DEFAULT_LOOKUP_SOURCE;
pub use matching::rebuild_match_result_index;
pub use models::{EntryRecord, MatchIndex, MatchKind, MatchResult, ReferenceTable, SequenceRecord};
pub use reader::{UniProtReader, VariantRegistry};
