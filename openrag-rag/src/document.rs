//! Documents, chunks and search results.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Metadata key holding the path or URL a document was loaded from.
pub const SOURCE_KEY: &str = "source";

/// A loaded document, before chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub source_uri: Option<String>,
}

impl Document {
    /// A document with a random id and no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            metadata: HashMap::new(),
            source_uri: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets `source_uri` and the matching `source` metadata entry.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.metadata.insert(SOURCE_KEY.to_string(), source.clone());
        self.source_uri = Some(source);
        self
    }
}

/// A piece of a [`Document`], the unit that is embedded and stored.
///
/// `metadata` is the parent document's metadata, unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
    pub document_id: String,
}

impl Chunk {
    /// Rebuilds the document view of a stored chunk.
    pub fn into_document(self) -> Document {
        let source_uri = self.metadata.get(SOURCE_KEY).cloned();
        Document { id: self.id, text: self.text, metadata: self.metadata, source_uri }
    }
}

/// A chunk returned from a vector store search, with its similarity score.
/// Higher scores are more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Conjunctive equality filter over document metadata.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        self.0.iter().all(|(field, expected)| metadata.get(field) == Some(expected))
    }

    /// Parses `field=value` pairs, as given on the command line.
    pub fn parse_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let mut filter = Filter::new();
        for pair in pairs {
            let (field, value) = pair.split_once('=')?;
            let field = field.trim();
            if field.is_empty() {
                return None;
            }
            filter = filter.eq(field, value.trim());
        }
        Some(filter)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
