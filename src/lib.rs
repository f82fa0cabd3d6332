//! # Citation Graph
//!
//! A batched, rate-limited client for PubMed Central that converts between
//! identifier schemes, follows citation links, fetches per-paper metadata
//! and links the authors of a paper to the authors of the papers it cites.
//!
//! ## Architecture
//!
//! - [`models`]: identifier schemes, metadata and linked-author records
//! - [`sources`]: the [`Source`] trait, the PMC implementation and a mock
//! - [`linking`]: the author linker and the end-to-end pipeline
//! - [`utils`]: HTTP client, throttle and opt-in retry
//! - [`config`]: configuration management

pub mod config;
pub mod linking;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use linking::{build_linked_authors, AuthorLinker};
pub use models::{FieldValue, IdType, LinkDirection, LinkedAuthors, Metadata, Paper};
pub use sources::{PmcSource, Source, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
