//! Dense vector retriever over a corpus

use crate::config::VectorSettings;
use crate::corpus::Corpus;
use crate::embedding::{EmbeddingProvider, VectorIndex};
use crate::error::{FuseError, Result};
use crate::retrieval::{RankedItem, RetrievalError, Retriever};
use std::sync::Arc;

/// Cosine-similarity retriever backed by an HNSW index
pub struct VectorRetriever {
    name: String,
    corpus: Arc<Corpus>,
    provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    ef_search: usize,
    min_similarity: f64,
}

impl VectorRetriever {
    /// Embed and index every document of the corpus
    ///
    /// The provider's dimension must match `vector.dimension`.
    pub fn build(
        corpus: Arc<Corpus>,
        provider: Arc<dyn EmbeddingProvider>,
        settings: &VectorSettings,
    ) -> Result<Self> {
        if provider.dimension() != settings.dimension {
            return Err(FuseError::InvalidConfigValue {
                path: "vector.dimension".to_string(),
                message: format!(
                    "{} produces {}D vectors but {}D is configured",
                    provider.model_name(),
                    provider.dimension(),
                    settings.dimension
                ),
            });
        }

        let mut index = VectorIndex::new(
            provider.dimension(),
            corpus.len(),
            settings.hnsw_m,
            settings.ef_construction,
        )
        .map_err(|e| FuseError::Index(e.to_string()))?;

        let texts: Vec<String> = corpus.documents().iter().map(|d| d.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            provider
                .embed_batch(&texts)
                .map_err(|e| FuseError::Index(format!("Embedding failed: {}", e)))?
        };

        let mut skipped = 0usize;
        for (position, embedding) in embeddings.iter().enumerate() {
            let inserted = index
                .insert(position, embedding)
                .map_err(|e| FuseError::Index(e.to_string()))?;
            if !inserted {
                skipped += 1;
            }
        }

        tracing::info!(
            "Built vector index over {} documents with {} ({}D, {} skipped)",
            corpus.len(),
            provider.model_name(),
            provider.dimension(),
            skipped
        );

        Ok(Self {
            name: "vector".to_string(),
            corpus,
            provider,
            index,
            ef_search: settings.ef_search,
            min_similarity: settings.min_similarity,
        })
    }

    /// Rename the retriever (names key weights and cache entries)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Retriever for VectorRetriever {
    fn name(&self) -> &str {
        &self.name
    }

    fn retrieve(&self, query: &str, k: usize) -> std::result::Result<Vec<RankedItem>, RetrievalError> {
        if self.index.is_empty() || k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self
            .provider
            .embed(query)
            .map_err(|e| RetrievalError::EmbeddingError(e.to_string()))?;

        let hits = self
            .index
            .search(&embedding, k, self.ef_search)
            .map_err(|e| RetrievalError::VectorSearchError(e.to_string()))?;

        let items: Vec<RankedItem> = hits
            .into_iter()
            .filter(|hit| f64::from(hit.score) > self.min_similarity)
            .filter_map(|hit| {
                self.corpus.get(hit.id).map(|doc| RankedItem {
                    id: doc.id.clone(),
                    raw_score: f64::from(hit.score),
                    payload: doc.text.clone(),
                })
            })
            .collect();

        tracing::debug!("Vector search for '{}' returned {} items", query, items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::embedding::HashingEmbedder;

    fn retriever(docs: Vec<Document>) -> VectorRetriever {
        let provider = Arc::new(HashingEmbedder::new(256).unwrap());
        VectorRetriever::build(
            Arc::new(Corpus::from_documents(docs)),
            provider,
            &VectorSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_exact_text_ranks_first() {
        let retriever = retriever(vec![
            Document::new("a", "reciprocal rank fusion merges ranked lists"),
            Document::new("b", "tomato soup with basil"),
            Document::new("c", "rank lists by relevance"),
        ]);

        let items = retriever
            .retrieve("reciprocal rank fusion merges ranked lists", 3)
            .unwrap();
        assert!(!items.is_empty());
        assert_eq!(items[0].id.as_str(), "a");
        assert!((items[0].raw_score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_query_without_tokens() {
        let retriever = retriever(vec![Document::new("a", "alpha beta gamma")]);
        assert!(retriever.retrieve("?!", 3).unwrap().is_empty());
        assert!(retriever.retrieve("   ", 3).unwrap().is_empty());
    }

    #[test]
    fn test_min_similarity_threshold() {
        let provider = Arc::new(HashingEmbedder::new(256).unwrap());
        let settings = VectorSettings {
            min_similarity: 0.99,
            ..VectorSettings::default()
        };
        let retriever = VectorRetriever::build(
            Arc::new(Corpus::from_documents(vec![
                Document::new("a", "alpha beta gamma"),
                Document::new("b", "alpha delta epsilon zeta"),
            ])),
            provider,
            &settings,
        )
        .unwrap();

        let items = retriever.retrieve("alpha beta gamma", 5).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "a");
    }

    #[test]
    fn test_empty_corpus() {
        let retriever = retriever(vec![]);
        assert!(retriever.retrieve("anything", 5).unwrap().is_empty());
    }

    #[test]
    fn test_provider_dimension_must_match_settings() {
        let provider = Arc::new(HashingEmbedder::new(64).unwrap());
        let result = VectorRetriever::build(
            Arc::new(Corpus::from_documents(vec![Document::new("a", "alpha")])),
            provider,
            &VectorSettings::default(),
        );
        assert!(matches!(result, Err(FuseError::InvalidConfigValue { .. })));

        let settings = VectorSettings {
            dimension: 64,
            ..VectorSettings::default()
        };
        let provider = Arc::new(HashingEmbedder::from_settings(&settings).unwrap());
        let retriever = VectorRetriever::build(
            Arc::new(Corpus::from_documents(vec![Document::new("a", "alpha")])),
            provider,
            &settings,
        )
        .unwrap();
        assert_eq!(retriever.retrieve("alpha", 1).unwrap().len(), 1);
    }
}
