//! seqxref Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared collaborators for the seqxref cross-reference providers:
//!
//! - **Error Handling**: `XrefError` and the crate `Result` alias
//! - **Logging**: tracing subscriber setup driven by `LogConfig`
//! - **Store**: JSON/CSV/TSV cache files used to persist fetched reference data
//!
//! # Example
//!
//! ```no_run
//! use seqxref_common::store::{DataFormat, DataStore};
//!
//! fn main() -> seqxref_common::Result<()> {
//!     let store = DataStore::new();
//!     store.mkdir("./cache")?;
//!     store.do_export("./cache/ids.json", &vec!["P69905"], DataFormat::Json)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use error::{Result, XrefError};
