//! Identifier schemes and citation link directions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::sources::SourceError;

/// Queried id -> converted id. Ids the service could not resolve are absent.
pub type ConversionResult = HashMap<String, String>;

/// Queried id -> linked ids, in the order the service returned them.
///
/// A missing key means the id has no links in that direction.
pub type CitationMap = HashMap<String, Vec<String>>;

/// Identifier scheme understood by the PMC ID converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Pmcid,
    Pmid,
    Mid,
    Doi,
}

impl IdType {
    /// All schemes, in the order the service documents them
    pub const ALL: [IdType; 4] = [IdType::Pmcid, IdType::Pmid, IdType::Mid, IdType::Doi];

    /// Attribute name carrying this scheme on an ID converter record
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Pmcid => "pmcid",
            IdType::Pmid => "pmid",
            IdType::Mid => "mid",
            IdType::Doi => "doi",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdType {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pmcid" => Ok(IdType::Pmcid),
            "pmid" => Ok(IdType::Pmid),
            "mid" => Ok(IdType::Mid),
            "doi" => Ok(IdType::Doi),
            other => Err(SourceError::InvalidArgument(format!(
                "unknown id type '{}' (expected one of pmcid, pmid, mid, doi)",
                other
            ))),
        }
    }
}

/// Which side of the citation graph to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkDirection {
    /// Papers that cite the queried paper
    Citing,
    /// Papers the queried paper cites
    CitedBy,
}

impl LinkDirection {
    /// ELink `linkname` selecting this direction
    pub fn link_name(&self) -> &'static str {
        match self {
            LinkDirection::Citing => "pubmed_pubmed_citedin",
            LinkDirection::CitedBy => "pubmed_pubmed_refs",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkDirection::Citing => "citing",
            LinkDirection::CitedBy => "cited_by",
        }
    }
}

impl fmt::Display for LinkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkDirection {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "citing" => Ok(LinkDirection::Citing),
            "cited_by" | "cited-by" => Ok(LinkDirection::CitedBy),
            other => Err(SourceError::InvalidArgument(format!(
                "unknown link direction '{}' (expected citing or cited_by)",
                other
            ))),
        }
    }
}

/// Strip a leading literal `PMC` tag, leaving the bare numeric id.
pub fn strip_pmc_prefix(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix("PMC").unwrap_or(id)
}
