//! Multi-retriever rank fusion
//!
//! This module combines semantic and keyword retrieval across query
//! variants: each retriever's ranked list is normalized (reciprocal rank,
//! relative score or distribution-based) and the lists are summed by item
//! identity into one ranking.

mod adapter;
mod cache;
mod fusion;
mod hybrid;
mod keyword;
mod normalize;
mod types;
mod vector;

pub use adapter::{RetrievalError, Retriever, RetrieverAdapter};
pub use cache::{CachedRetriever, QueryCache};
pub use fusion::FusionCombiner;
pub use hybrid::{fuse, FusionOptions, RankFusion};
pub use keyword::KeywordRetriever;
pub use normalize::{
    distribution_scores, reciprocal_rank_scores, relative_scores, NormalizationMode,
    ScoreNormalizer, DEFAULT_RRF_K,
};
pub use types::{Contribution, FusedResult, NormalizedItem, RankedItem, SourceTag};
pub use vector::VectorRetriever;
