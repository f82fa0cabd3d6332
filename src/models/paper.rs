//! Paper model: a PMC id and the metadata fetched for it.

use serde::{Deserialize, Serialize};

use super::Metadata;
use crate::sources::{Source, SourceError};

/// A paper identified by its PMC id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// PMC id, with or without the `PMC` tag
    pub pmcid: String,

    /// Metadata, empty until [`Paper::fetch_metadata`] succeeds
    #[serde(default)]
    pub metadata: Metadata,
}

impl Paper {
    pub fn new(pmcid: impl Into<String>) -> Self {
        Self {
            pmcid: pmcid.into(),
            metadata: Metadata::new(),
        }
    }

    /// Fetch this paper's metadata from `source`, keep a copy and return it
    pub async fn fetch_metadata(&mut self, source: &dyn Source) -> Result<Metadata, SourceError> {
        let metadata = source.get_metadata(&self.pmcid).await?;
        self.metadata = metadata.clone();
        Ok(metadata)
    }

    /// Authors of this paper, if the metadata has any
    pub fn authors(&self) -> Option<Vec<String>> {
        self.metadata.values_of("Author")
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("Title").and_then(|v| v.values().first().copied())
    }
}

/// Authors of one paper together with the authors of every paper it cites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAuthors {
    pub paper_id: String,
    pub authors: Vec<String>,
    pub cited_authors: Vec<String>,
}

impl LinkedAuthors {
    /// The `(authors, cited_authors)` pair
    pub fn into_pair(self) -> (Vec<String>, Vec<String>) {
        (self.authors, self.cited_authors)
    }
}
