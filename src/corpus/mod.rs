//! Documents and stable item identity
//!
//! Every document carries an [`ItemId`] that fusion uses to merge results
//! coming from different retrievers. The id is either assigned by the caller
//! or derived from a BLAKE3 hash of the full content, so two documents that
//! merely share a prefix never collide.

use crate::error::{FuseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;
use std::path::Path;

/// Stable identity of a retrievable item
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Externally assigned document id
    pub fn explicit(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity derived from the full content (BLAKE3)
    pub fn from_content(text: &str) -> Self {
        Self(format!("content:{}", blake3::hash(text.as_bytes()).to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::explicit(id)
    }
}

/// A document in the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: ItemId,
    pub text: String,
}

impl Document {
    /// Document with a caller-assigned id
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ItemId::explicit(id),
            text: text.into(),
        }
    }

    /// Document identified by the hash of its content
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: ItemId::from_content(&text),
            text,
        }
    }
}

/// One line of a JSONL corpus file
#[derive(Debug, Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    id: Option<String>,
    text: String,
}

/// Read-only collection of documents shared by retrievers
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Build a corpus, dropping later documents whose id repeats an earlier one
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut kept = Vec::new();

        for doc in documents {
            if seen.insert(doc.id.clone()) {
                kept.push(doc);
            } else {
                tracing::debug!("Skipping duplicate document id {}", doc.id);
            }
        }

        Self { documents: kept }
    }

    /// Load a JSONL corpus: `{"id": "optional", "text": "..."}` per line
    pub fn load_jsonl(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| FuseError::Io {
            source: e,
            context: format!("Failed to open corpus file: {:?}", path),
        })?;

        let mut documents = Vec::new();
        for (line_no, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| FuseError::Io {
                source: e,
                context: format!("Failed to read corpus file: {:?}", path),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record: DocumentRecord =
                serde_json::from_str(&line).map_err(|e| FuseError::Json {
                    source: e,
                    context: format!("{:?} line {}", path, line_no + 1),
                })?;

            documents.push(match record.id {
                Some(id) => Document::new(id, record.text),
                None => Document::from_text(record.text),
            });
        }

        let corpus = Self::from_documents(documents);
        tracing::info!("Loaded {} documents from {:?}", corpus.len(), path);
        Ok(corpus)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_content_ids_do_not_collide_on_shared_prefix() {
        let a = Document::from_text("Paris is the capital of France.");
        let b = Document::from_text("Paris is the capital of France. It hosts the Louvre.");
        assert_ne!(a.id, b.id);

        let again = Document::from_text("Paris is the capital of France.");
        assert_eq!(a.id, again.id);
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let corpus = Corpus::from_documents(vec![
            Document::new("a", "first"),
            Document::new("a", "second"),
            Document::new("b", "third"),
        ]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents()[0].text, "first");
    }

    #[test]
    fn test_load_jsonl() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "doc-1", "text": "alpha beta"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"text": "gamma delta"}}"#).unwrap();

        let corpus = Corpus::load_jsonl(file.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.documents()[0].id.as_str(), "doc-1");
        assert!(corpus.documents()[1].id.as_str().starts_with("content:"));
    }

    #[test]
    fn test_load_jsonl_reports_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text": "ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        match Corpus::load_jsonl(file.path()) {
            Err(FuseError::Json { context, .. }) => assert!(context.ends_with("line 2")),
            other => panic!("expected JSON error, got {:?}", other.map(|c| c.len())),
        }
    }
}
