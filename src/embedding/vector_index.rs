/// HNSW vector index for similarity search
use hnsw_rs::prelude::*;
use thiserror::Error;

/// Upper bound on HNSW layers (hnsw_rs caps at 16)
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// Search result with ID and similarity score
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// ID of the item (position in the corpus)
    pub id: usize,
    /// Cosine similarity score (-1.0 to 1.0, higher is more similar)
    pub score: f32,
}

/// HNSW vector index wrapper
///
/// Provides approximate nearest neighbor search using cosine distance.
/// Zero-norm vectors have no direction and are never inserted.
pub struct VectorIndex {
    index: Hnsw<'static, f32, DistCosine>,
    dimension: usize,
    count: usize,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `max_elements` - Expected number of vectors
    /// * `m` - HNSW M parameter (number of connections per layer)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    pub fn new(
        dimension: usize,
        max_elements: usize,
        m: usize,
        ef_construction: usize,
    ) -> Result<Self, VectorIndexError> {
        if dimension == 0 || m == 0 || ef_construction == 0 {
            return Err(VectorIndexError::InitializationError(
                "dimension, m and ef_construction must be greater than 0".to_string(),
            ));
        }

        let index = Hnsw::<f32, DistCosine>::new(
            m,
            max_elements.max(1),
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Ok(Self {
            index,
            dimension,
            count: 0,
        })
    }

    /// Insert a vector into the index
    ///
    /// Returns `false` if the vector was skipped because it has zero norm.
    pub fn insert(&mut self, id: usize, vector: &[f32]) -> Result<bool, VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        if is_zero(vector) {
            tracing::debug!("Skipping zero-norm vector {}", id);
            return Ok(false);
        }

        self.index.insert((vector, id));
        self.count += 1;

        Ok(true)
    }

    /// Search for k nearest neighbors
    ///
    /// # Returns
    /// Results sorted by similarity descending
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if k == 0 || self.is_empty() || is_zero(query) {
            return Ok(Vec::new());
        }

        let neighbours = self.index.search(query, k, ef_search.max(k));

        let mut results: Vec<SearchResult> = neighbours
            .into_iter()
            .map(|neighbour| SearchResult {
                id: neighbour.d_id,
                score: 1.0 - neighbour.distance, // Convert distance to similarity
            })
            .collect();

        if results.iter().any(|r| !r.score.is_finite()) {
            return Err(VectorIndexError::SearchError(
                "Non-finite distance returned by HNSW".to_string(),
            ));
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }

    /// Get the number of vectors in the index
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Get vector dimension
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|v| *v == 0.0)
}
