//! Retriever contract and the boundary adapter the fusion core consumes
//!
//! A [`Retriever`] may fail or return loosely ordered results. The
//! [`RetrieverAdapter`] turns whatever it returns into a clean ranked list:
//! errors become empty lists, non-finite scores are dropped, duplicate ids
//! collapse to their best entry, and the list is sorted and truncated.

use crate::error::{FuseError, Result};
use crate::retrieval::RankedItem;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(String),

    #[error("Vector search failed: {0}")]
    VectorSearchError(String),

    #[error("Keyword search failed: {0}")]
    KeywordSearchError(String),

    #[error("Retrieval timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A single retrieval strategy over some corpus
pub trait Retriever: Send + Sync {
    /// Name used for provenance and weighting
    fn name(&self) -> &str;

    /// Return up to `k` candidates for `query`
    fn retrieve(&self, query: &str, k: usize) -> std::result::Result<Vec<RankedItem>, RetrievalError>;
}

/// Boundary wrapper around a retriever with its fusion weight
#[derive(Clone)]
pub struct RetrieverAdapter {
    inner: Arc<dyn Retriever>,
    weight: f64,
}

impl std::fmt::Debug for RetrieverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrieverAdapter")
            .field("name", &self.name())
            .field("weight", &self.weight)
            .finish()
    }
}

impl RetrieverAdapter {
    /// Wrap a retriever with weight 1.0
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            inner: retriever,
            weight: 1.0,
        }
    }

    /// Set the fusion weight (must be positive and finite)
    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(FuseError::InvalidWeight {
                retriever: self.name().to_string(),
                weight,
            });
        }
        self.weight = weight;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Retrieve and validate; never fails
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RankedItem> {
        if k == 0 {
            return Vec::new();
        }

        match self.inner.retrieve(query, k) {
            Ok(items) => sanitize(self.name(), items, k),
            Err(e) => {
                tracing::warn!("Retriever '{}' failed, treating as no results: {}", self.name(), e);
                Vec::new()
            }
        }
    }
}

/// Enforce the ranked-list contract on raw retriever output
pub(crate) fn sanitize(retriever: &str, items: Vec<RankedItem>, k: usize) -> Vec<RankedItem> {
    let total = items.len();
    let mut items: Vec<RankedItem> = items
        .into_iter()
        .filter(|item| item.raw_score.is_finite())
        .collect();

    if items.len() < total {
        tracing::warn!(
            "Retriever '{}' returned {} non-finite scores, dropped",
            retriever,
            total - items.len()
        );
    }

    // Stable: equal scores keep the retriever's own order
    items.sort_by(|a, b| b.raw_score.total_cmp(&a.raw_score));

    let mut seen = HashSet::new();
    items.retain(|item| {
        let fresh = seen.insert(item.id.clone());
        if !fresh {
            tracing::debug!("Retriever '{}' returned duplicate id {}", retriever, item.id);
        }
        fresh
    });

    items.truncate(k);
    items
}
