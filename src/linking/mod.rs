//! Linking a paper's authors to the authors of the papers it cites.

use std::collections::HashMap;

use crate::models::{CitationMap, IdType, LinkDirection, LinkedAuthors, Metadata, Paper};
use crate::sources::{Source, SourceError};

const AUTHOR_FIELD: &str = "Author";

/// Builds [`LinkedAuthors`] for papers, fetching cited papers through a [`Source`]
#[derive(Debug, Clone, Copy)]
pub struct AuthorLinker<'a> {
    source: &'a dyn Source,
}

impl<'a> AuthorLinker<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        Self { source }
    }

    /// Link the authors of one paper.
    ///
    /// `paper_id` keys `metadata` (a PMCID) and `citation_key` keys `cited`
    /// (a PMID). The paper's own authors are required. Cited papers without
    /// authors are skipped with a warning.
    pub async fn link(
        &self,
        paper_id: &str,
        citation_key: &str,
        metadata: &HashMap<String, Metadata>,
        cited: &CitationMap,
    ) -> Result<LinkedAuthors, SourceError> {
        let authors = metadata
            .get(paper_id)
            .and_then(|m| m.values_of(AUTHOR_FIELD))
            .ok_or_else(|| SourceError::MissingField {
                paper_id: paper_id.to_string(),
                field: AUTHOR_FIELD.to_string(),
            })?;

        let cited_ids = cited.get(citation_key).cloned().unwrap_or_default();
        let mut cited_authors = Vec::new();

        if !cited_ids.is_empty() {
            let converted = self.source.convert(&cited_ids, IdType::Pmcid).await?;

            let unconverted = cited_ids
                .iter()
                .filter(|id| !converted.contains_key(*id))
                .count();
            if unconverted > 0 {
                tracing::debug!(
                    "{}: {} of {} cited papers have no PMCID",
                    paper_id,
                    unconverted,
                    cited_ids.len()
                );
            }

            for cited_id in cited_ids.iter().filter_map(|id| converted.get(id)) {
                let mut paper = Paper::new(cited_id.as_str());
                paper.fetch_metadata(self.source).await?;

                match paper.authors() {
                    Some(found) => cited_authors.extend(found),
                    None => tracing::warn!("Cited paper {} has no {}", cited_id, AUTHOR_FIELD),
                }
            }
        }

        tracing::debug!(
            "{}: {} authors, {} cited authors from {} cited papers",
            paper_id,
            authors.len(),
            cited_authors.len(),
            cited_ids.len()
        );

        Ok(LinkedAuthors {
            paper_id: paper_id.to_string(),
            authors,
            cited_authors,
        })
    }
}

/// Run the whole pipeline for a list of PMC ids.
///
/// Ids are converted to PMIDs, the papers they cite are looked up, and each
/// input paper that resolved is linked in input order. Inputs without a PMID
/// are skipped with a warning.
pub async fn build_linked_authors(
    source: &dyn Source,
    pmcids: &[String],
) -> Result<Vec<LinkedAuthors>, SourceError> {
    let pmids = source.convert(pmcids, IdType::Pmid).await?;

    let resolved: Vec<(&String, &String)> = pmcids
        .iter()
        .filter_map(|pmcid| match pmids.get(pmcid) {
            Some(pmid) => Some((pmcid, pmid)),
            None => {
                tracing::warn!("Skipping {}: no PMID", pmcid);
                None
            }
        })
        .collect();

    if resolved.is_empty() {
        return Ok(Vec::new());
    }

    let pmid_list: Vec<String> = resolved.iter().map(|(_, pmid)| (*pmid).clone()).collect();
    let cited = source
        .get_citations(&pmid_list, LinkDirection::CitedBy)
        .await?;

    let linker = AuthorLinker::new(source);
    let mut metadata = HashMap::with_capacity(resolved.len());
    let mut linked = Vec::with_capacity(resolved.len());

    for (pmcid, pmid) in resolved {
        let mut paper = Paper::new(pmcid.as_str());
        metadata.insert(pmcid.clone(), paper.fetch_metadata(source).await?);
        linked.push(linker.link(pmcid, pmid, &metadata, &cited).await?);
    }

    tracing::info!("Linked authors for {} of {} papers", linked.len(), pmcids.len());
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    fn authored(authors: &[&str]) -> Metadata {
        let mut metadata = Metadata::from_pairs([("Title", "T")]);
        for author in authors {
            metadata.insert("Author", *author);
        }
        metadata
    }

    #[tokio::test]
    async fn test_link_collects_cited_authors_in_order() {
        let source = MockSource::new()
            .with_conversion(IdType::Pmcid, "11", "PMC11")
            .with_conversion(IdType::Pmcid, "12", "PMC12")
            .with_metadata("PMC11", authored(&["B", "C"]))
            .with_metadata("PMC12", authored(&["D"]));

        let metadata = HashMap::from([("PMC1".to_string(), authored(&["A"]))]);
        let cited = CitationMap::from([(
            "1".to_string(),
            vec!["11".to_string(), "12".to_string()],
        )]);

        let linked = AuthorLinker::new(&source)
            .link("PMC1", "1", &metadata, &cited)
            .await
            .unwrap();

        assert_eq!(linked.authors, vec!["A"]);
        assert_eq!(linked.cited_authors, vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_link_primary_without_authors_fails() {
        let source = MockSource::new();
        let metadata = HashMap::from([("PMC1".to_string(), Metadata::from_pairs([("Title", "T")]))]);

        let result = AuthorLinker::new(&source)
            .link("PMC1", "1", &metadata, &CitationMap::new())
            .await;

        match result {
            Err(SourceError::MissingField { paper_id, field }) => {
                assert_eq!(paper_id, "PMC1");
                assert_eq!(field, "Author");
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_link_skips_cited_paper_without_authors() {
        let source = MockSource::new()
            .with_conversion(IdType::Pmcid, "11", "PMC11")
            .with_conversion(IdType::Pmcid, "12", "PMC12")
            .with_metadata("PMC11", Metadata::from_pairs([("Title", "No authors")]))
            .with_metadata("PMC12", authored(&["D"]));

        let metadata = HashMap::from([("PMC1".to_string(), authored(&["A"]))]);
        let cited = CitationMap::from([(
            "1".to_string(),
            vec!["11".to_string(), "12".to_string()],
        )]);

        let linked = AuthorLinker::new(&source)
            .link("PMC1", "1", &metadata, &cited)
            .await
            .unwrap();

        assert_eq!(linked.cited_authors, vec!["D"]);
    }

    #[tokio::test]
    async fn test_link_skips_cited_ids_without_pmcid() {
        let source = MockSource::new()
            .with_conversion(IdType::Pmcid, "12", "PMC12")
            .with_metadata("PMC12", authored(&["D"]));

        let metadata = HashMap::from([("PMC1".to_string(), authored(&["A"]))]);
        let cited = CitationMap::from([(
            "1".to_string(),
            vec!["11".to_string(), "12".to_string()],
        )]);

        let linked = AuthorLinker::new(&source)
            .link("PMC1", "1", &metadata, &cited)
            .await
            .unwrap();

        assert_eq!(linked.cited_authors, vec!["D"]);
        assert_eq!(
            source.calls(),
            vec!["convert:pmcid:11,12".to_string(), "metadata:PMC12".to_string()]
        );
    }

    #[tokio::test]
    async fn test_link_without_citations_makes_no_requests() {
        let source = MockSource::new();
        let metadata = HashMap::from([("PMC1".to_string(), authored(&["A", "B"]))]);

        let linked = AuthorLinker::new(&source)
            .link("PMC1", "1", &metadata, &CitationMap::new())
            .await
            .unwrap();

        assert_eq!(linked.into_pair(), (vec!["A".to_string(), "B".to_string()], vec![]));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_build_linked_authors_pipeline() {
        let source = MockSource::new()
            .with_conversion(IdType::Pmid, "PMC1", "1")
            .with_conversion(IdType::Pmid, "PMC2", "2")
            .with_conversion(IdType::Pmcid, "11", "PMC11")
            .with_citations(LinkDirection::CitedBy, "1", &["11"])
            .with_metadata("PMC1", authored(&["A"]))
            .with_metadata("PMC2", authored(&["E"]))
            .with_metadata("PMC11", authored(&["B"]));

        let inputs = vec!["PMC1".to_string(), "PMC9".to_string(), "PMC2".to_string()];
        let linked = build_linked_authors(&source, &inputs).await.unwrap();

        assert_eq!(linked.len(), 2);
        assert_eq!(linked[0].paper_id, "PMC1");
        assert_eq!(linked[0].cited_authors, vec!["B"]);
        assert_eq!(linked[1].paper_id, "PMC2");
        assert!(linked[1].cited_authors.is_empty());

        let calls = source.calls();
        assert_eq!(calls[0], "convert:pmid:PMC1,PMC9,PMC2");
        assert_eq!(calls[1], "citations:cited_by:1,2");
    }

    #[tokio::test]
    async fn test_build_linked_authors_nothing_resolved() {
        let source = MockSource::new();
        let linked = build_linked_authors(&source, &["PMC9".to_string()])
            .await
            .unwrap();
        assert!(linked.is_empty());
        assert_eq!(source.calls().len(), 1);
    }
}
