//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{CitationMap, ConversionResult, IdType, LinkDirection, Metadata};
use crate::sources::{Source, SourceError};

/// A mock source that answers from predefined tables and records its calls.
#[derive(Debug, Default)]
pub struct MockSource {
    conversions: HashMap<IdType, ConversionResult>,
    citations: HashMap<LinkDirection, CitationMap>,
    metadata: HashMap<String, Metadata>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `from` to `to` when converting to `id_type`.
    pub fn with_conversion(mut self, id_type: IdType, from: &str, to: &str) -> Self {
        self.conversions
            .entry(id_type)
            .or_default()
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Link `id` to `linked` in `direction`.
    pub fn with_citations(mut self, direction: LinkDirection, id: &str, linked: &[&str]) -> Self {
        self.citations.entry(direction).or_default().insert(
            id.to_string(),
            linked.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Serve `metadata` for `id`.
    pub fn with_metadata(mut self, id: &str, metadata: Metadata) -> Self {
        self.metadata.insert(id.to_string(), metadata);
        self
    }

    /// Calls received so far, as `operation:argument` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    fn record(&self, call: String) {
        self.lock_calls().push(call);
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn convert(&self, ids: &[String], to: IdType) -> Result<ConversionResult, SourceError> {
        self.record(format!("convert:{}:{}", to, ids.join(",")));
        if ids.is_empty() {
            return Err(SourceError::InvalidArgument("at least one id is required".into()));
        }

        let table = self.conversions.get(&to);
        Ok(ids
            .iter()
            .filter_map(|id| {
                table
                    .and_then(|t| t.get(id))
                    .map(|converted| (id.clone(), converted.clone()))
            })
            .collect())
    }

    async fn get_citations(
        &self,
        ids: &[String],
        direction: LinkDirection,
    ) -> Result<CitationMap, SourceError> {
        self.record(format!("citations:{}:{}", direction, ids.join(",")));
        if ids.is_empty() {
            return Err(SourceError::InvalidArgument("at least one id is required".into()));
        }

        let table = self.citations.get(&direction);
        Ok(ids
            .iter()
            .filter_map(|id| {
                table
                    .and_then(|t| t.get(id))
                    .map(|linked| (id.clone(), linked.clone()))
            })
            .collect())
    }

    async fn get_metadata(&self, id: &str) -> Result<Metadata, SourceError> {
        self.record(format!("metadata:{}", id));
        self.metadata
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::MalformedResponse(format!("no summary for {}", id)))
    }
}
