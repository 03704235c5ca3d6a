//! Ranked, normalized and fused result structures

use crate::corpus::ItemId;
use serde::{Deserialize, Serialize};

/// One candidate returned by a single retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    /// Stable identity used to merge results across retrievers
    pub id: ItemId,

    /// Retriever-specific relevance (higher is better)
    pub raw_score: f64,

    /// Opaque content carried through fusion unchanged
    pub payload: String,
}

impl RankedItem {
    pub fn new(id: impl Into<ItemId>, raw_score: f64, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_score,
            payload: payload.into(),
        }
    }
}

/// Where a normalized score came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTag {
    /// Index of the query variant that produced the list
    pub query_index: usize,

    /// Name of the retriever that produced the list
    pub retriever: String,
}

impl SourceTag {
    pub fn new(query_index: usize, retriever: impl Into<String>) -> Self {
        Self {
            query_index,
            retriever: retriever.into(),
        }
    }
}

/// A ranked item with its score rescaled into a comparable range
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub item: RankedItem,
    pub normalized_score: f64,
    /// 0-indexed position within the source list
    pub rank: usize,
    pub source: SourceTag,
    /// Retriever fusion weight
    pub weight: f64,
}

/// Per-source breakdown of a fused score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source_query_index: usize,
    pub source_retriever: String,
    pub rank: usize,
    pub raw_score: f64,
    pub normalized_score: f64,
    pub weight: f64,
}

impl Contribution {
    /// Amount added to the combined score
    pub fn weighted_score(&self) -> f64 {
        self.normalized_score * self.weight
    }
}

/// Final fused result for one item identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub id: ItemId,

    /// Sum of weighted normalized scores from every contributing source
    pub combined_score: f64,

    /// Contributions in arrival order
    pub contributions: Vec<Contribution>,

    /// Payload from the first contributing source
    pub payload: String,
}

impl FusedResult {
    /// Lowest query variant index among the contributions
    pub fn min_query_index(&self) -> usize {
        self.contributions
            .iter()
            .map(|c| c.source_query_index)
            .min()
            .unwrap_or(usize::MAX)
    }

    /// Get a short preview of the payload (first N characters)
    pub fn preview(&self, max_chars: usize) -> String {
        match self.payload.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &self.payload[..byte_idx]),
            None => self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        let result = FusedResult {
            id: ItemId::explicit("a"),
            combined_score: 1.0,
            contributions: vec![],
            payload: "héllo wörld".to_string(),
        };

        assert_eq!(result.preview(5), "héllo...");
        assert_eq!(result.preview(100), "héllo wörld");
    }
}
