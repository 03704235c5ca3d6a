mod keyword_index;
/// Embedding & indexing backends for the concrete retrievers
///
/// Architecture:
/// - EmbeddingProvider trait for abstraction
/// - HashingEmbedder for local, model-free embedding
/// - HNSW for vector similarity search
/// - Tantivy for keyword (BM25) search
mod provider;
mod vector_index;

pub use keyword_index::{KeywordIndex, KeywordIndexError, KeywordSearchResult};
pub use provider::{EmbeddingError, EmbeddingProvider, HashingEmbedder};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};
