//! Score fusion across normalized result lists

use crate::corpus::ItemId;
use crate::retrieval::{Contribution, FusedResult, NormalizedItem};
use ahash::{HashMap, HashMapExt};

struct Entry {
    result: FusedResult,
    arrival: usize,
}

/// Accumulates normalized items by identity for one logical query
///
/// `combined_score(id) = sum over sources of normalized_score * weight`.
/// Items a source did not return simply receive nothing from it.
pub struct FusionCombiner {
    index: HashMap<ItemId, usize>,
    entries: Vec<Entry>,
}

impl FusionCombiner {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Add one normalized item
    pub fn add(&mut self, normalized: NormalizedItem) {
        let NormalizedItem {
            item,
            normalized_score,
            rank,
            source,
            weight,
        } = normalized;

        let contribution = Contribution {
            source_query_index: source.query_index,
            source_retriever: source.retriever,
            rank,
            raw_score: item.raw_score,
            normalized_score,
            weight,
        };

        let slot = match self.index.get(&item.id) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.index.insert(item.id.clone(), slot);
                self.entries.push(Entry {
                    result: FusedResult {
                        id: item.id,
                        combined_score: 0.0,
                        contributions: Vec::new(),
                        payload: item.payload,
                    },
                    arrival: slot,
                });
                slot
            }
        };

        let entry = &mut self.entries[slot].result;
        entry.combined_score += contribution.weighted_score();
        entry.contributions.push(contribution);
    }

    /// Add every item of one normalized list
    pub fn extend(&mut self, items: impl IntoIterator<Item = NormalizedItem>) {
        for item in items {
            self.add(item);
        }
    }

    /// Number of distinct identities seen so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort by combined score and keep the best `top_k`
    ///
    /// Ties go to the item seen by the lowest query variant index, then to
    /// the item that arrived first.
    pub fn finalize(self, top_k: usize) -> Vec<FusedResult> {
        let mut entries = self.entries;

        entries.sort_by(|a, b| {
            b.result
                .combined_score
                .total_cmp(&a.result.combined_score)
                .then_with(|| a.result.min_query_index().cmp(&b.result.min_query_index()))
                .then_with(|| a.arrival.cmp(&b.arrival))
        });

        entries
            .into_iter()
            .take(top_k)
            .map(|entry| entry.result)
            .collect()
    }
}

impl Default for FusionCombiner {
    fn default() -> Self {
        Self::new()
    }
}
