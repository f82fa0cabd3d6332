//! Per-paper metadata as returned by the summary endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of a metadata field.
///
/// A field seen once is `Single`; a field seen more than once is `Multiple`
/// holding every occurrence in document order. Callers must handle both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    /// Add another occurrence, promoting a scalar to a sequence.
    pub fn push(&mut self, value: String) {
        match self {
            FieldValue::Single(first) => {
                let first = std::mem::take(first);
                *self = FieldValue::Multiple(vec![first, value]);
            }
            FieldValue::Multiple(values) => values.push(value),
        }
    }

    /// Borrow every occurrence, in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            FieldValue::Single(value) => vec![value],
            FieldValue::Multiple(values) => values,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, FieldValue::Multiple(_))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

/// Field name -> value for one paper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: BTreeMap<String, FieldValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat list of (name, value) pairs, in document order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut metadata = Self::new();
        for (name, value) in pairs {
            metadata.insert(name, value);
        }
        metadata
    }

    /// Record one occurrence of a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.fields.entry(name.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(FieldValue::Single(value));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => slot.get_mut().push(value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Every value of `name`, or `None` if the field never occurred
    pub fn values_of(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|v| v.clone().into_vec())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}
