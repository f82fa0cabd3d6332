//! Bibliographic sources behind a common trait.
//!
//! [`PmcSource`] talks to the PMC ID converter and NCBI E-utilities.
//! [`MockSource`] serves canned answers so that code built on [`Source`]
//! (the author linker in particular) can be tested without a network.

mod mock;
mod pmc;

pub use mock::MockSource;
pub use pmc::PmcSource;

use async_trait::async_trait;

use crate::models::{CitationMap, ConversionResult, IdType, LinkDirection, Metadata};

/// Operations a bibliographic source offers.
///
/// Every operation issues its requests one after another and returns a
/// freshly built result; nothing is shared between calls.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Convert `ids` to the `to` scheme.
    ///
    /// Ids the service cannot resolve are left out of the result.
    async fn convert(&self, ids: &[String], to: IdType) -> Result<ConversionResult, SourceError>;

    /// Citation links of `ids` in the given direction.
    ///
    /// Ids without links are left out of the result.
    async fn get_citations(
        &self,
        ids: &[String],
        direction: LinkDirection,
    ) -> Result<CitationMap, SourceError>;

    /// Metadata of a single paper
    async fn get_metadata(&self, id: &str) -> Result<Metadata, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Bad caller input, detected before any request is sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection, timeout or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Status { status: u16, endpoint: String },

    /// The response could not be parsed or lacks a required attribute
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A required field is absent from otherwise well-formed data
    #[error("Paper {paper_id} has no {field}")]
    MissingField { paper_id: String, field: String },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Transport(err.to_string())
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::MalformedResponse(format!("XML: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::MalformedResponse(format!("XML: {}", err))
    }
}
