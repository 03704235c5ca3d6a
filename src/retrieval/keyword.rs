//! BM25 keyword retriever over a corpus

use crate::config::KeywordSettings;
use crate::corpus::Corpus;
use crate::embedding::KeywordIndex;
use crate::error::{FuseError, Result};
use crate::retrieval::{RankedItem, RetrievalError, Retriever};
use std::sync::Arc;

/// Sparse lexical retriever backed by Tantivy
pub struct KeywordRetriever {
    name: String,
    corpus: Arc<Corpus>,
    index: KeywordIndex,
    min_score: f64,
}

impl KeywordRetriever {
    /// Index every document of the corpus
    pub fn build(corpus: Arc<Corpus>, settings: &KeywordSettings) -> Result<Self> {
        let mut index = KeywordIndex::in_memory(settings.writer_memory_bytes)
            .map_err(|e| FuseError::Index(e.to_string()))?;

        for (position, doc) in corpus.documents().iter().enumerate() {
            index
                .insert(position as u64, &doc.text)
                .map_err(|e| FuseError::Index(e.to_string()))?;
        }
        index.commit().map_err(|e| FuseError::Index(e.to_string()))?;

        tracing::info!("Built keyword index over {} documents", corpus.len());

        Ok(Self {
            name: "bm25".to_string(),
            corpus,
            index,
            min_score: settings.min_score,
        })
    }

    /// Rename the retriever (names key weights and cache entries)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Retriever for KeywordRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    fn retrieve(&self, query: &str, k: usize) -> std::result::Result<Vec<RankedItem>, RetrievalError> {
        if self.corpus.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let hits = self
            .index
            .search(query, k)
            .map_err(|e| RetrievalError::KeywordSearchError(e.to_string()))?;

        let items: Vec<RankedItem> = hits
            .into_iter()
            .filter(|hit| f64::from(hit.score) > self.min_score)
            .filter_map(|hit| {
                self.corpus.get(hit.id as usize).map(|doc| RankedItem {
                    id: doc.id.clone(),
                    raw_score: f64::from(hit.score),
                    payload: doc.text.clone(),
                })
            })
            .collect();

        tracing::debug!("Keyword search for '{}' returned {} items", query, items.len());
        Ok(items)
    }
}
