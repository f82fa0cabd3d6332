//! Core data models: identifier schemes, metadata and papers.

mod ids;
mod metadata;
mod paper;

pub use ids::{strip_pmc_prefix, CitationMap, ConversionResult, IdType, LinkDirection};
pub use metadata::{FieldValue, Metadata};
pub use paper::{LinkedAuthors, Paper};
