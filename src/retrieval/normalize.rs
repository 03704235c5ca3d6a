//! Score normalization policies
//!
//! Each policy is a pure function over one retriever's ranked list and never
//! looks at any other list.

use crate::error::{FuseError, Result};
use crate::retrieval::{NormalizedItem, RankedItem, SourceTag};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default RRF K constant
pub const DEFAULT_RRF_K: f64 = 60.0;

/// How raw retriever scores are made comparable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// `1 / (rank + 1 + K)`, ignores score magnitudes
    ReciprocalRank,
    /// `score / max_score` within the list
    RelativeScore,
    /// `sigmoid((score - mean) / std)` within the list
    DistributionBased,
}

impl NormalizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReciprocalRank => "reciprocal_rank",
            Self::RelativeScore => "relative_score",
            Self::DistributionBased => "distribution_based",
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalizationMode {
    type Err = FuseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reciprocal_rank" | "reciprocal_rerank" | "rrf" => Ok(Self::ReciprocalRank),
            "relative_score" => Ok(Self::RelativeScore),
            "distribution_based" | "dist_based_score" | "dbsf" => Ok(Self::DistributionBased),
            _ => Err(FuseError::InvalidNormalizationMode {
                mode: s.to_string(),
            }),
        }
    }
}

/// Reciprocal-rank scores for a list of `len` items
pub fn reciprocal_rank_scores(len: usize, rrf_k: f64) -> Vec<f64> {
    (0..len).map(|rank| 1.0 / (rank as f64 + 1.0 + rrf_k)).collect()
}

/// Scores divided by the list maximum, clamped to [0, 1]
///
/// A list whose maximum is not positive maps every item to 0.
pub fn relative_scores(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if raw.is_empty() || max <= 0.0 {
        return vec![0.0; raw.len()];
    }

    raw.iter().map(|s| (s / max).clamp(0.0, 1.0)).collect()
}

/// Sigmoid of the z-score within the list (population std)
///
/// Zero spread maps every item to `sigmoid(0) = 0.5`.
pub fn distribution_scores(raw: &[f64]) -> Vec<f64> {
    let (lo, hi) = raw
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    if raw.is_empty() || lo == hi {
        return vec![0.5; raw.len()];
    }

    // z-scores are scale invariant; working in [-1, 1] keeps scores near
    // f64::MAX from overflowing the mean and variance
    let scale = lo.abs().max(hi.abs());
    let scaled: Vec<f64> = raw.iter().map(|s| s / scale).collect();

    let n = raw.len() as f64;
    let mean = scaled.iter().map(|u| u / n).sum::<f64>();
    let std_dev = (scaled.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / n).sqrt();

    scaled
        .iter()
        .map(|u| {
            let z = if std_dev > 0.0 { (u - mean) / std_dev } else { 0.0 };
            sigmoid(z)
        })
        .collect()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Applies one normalization policy to ranked lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNormalizer {
    mode: NormalizationMode,
    rrf_k: f64,
}

impl ScoreNormalizer {
    pub fn new(mode: NormalizationMode, rrf_k: f64) -> Result<Self> {
        if !rrf_k.is_finite() || rrf_k < 0.0 {
            return Err(FuseError::InvalidConfigValue {
                path: "fusion.rrf_k".to_string(),
                message: format!("RRF K must be finite and non-negative, got {}", rrf_k),
            });
        }
        Ok(Self { mode, rrf_k })
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    pub fn rrf_k(&self) -> f64 {
        self.rrf_k
    }

    /// Scores for a list already in rank order
    pub fn scores(&self, items: &[RankedItem]) -> Vec<f64> {
        match self.mode {
            NormalizationMode::ReciprocalRank => reciprocal_rank_scores(items.len(), self.rrf_k),
            NormalizationMode::RelativeScore => {
                relative_scores(&items.iter().map(|i| i.raw_score).collect::<Vec<_>>())
            }
            NormalizationMode::DistributionBased => {
                distribution_scores(&items.iter().map(|i| i.raw_score).collect::<Vec<_>>())
            }
        }
    }

    /// Normalize one ranked list, tagging each item with its source
    pub fn normalize(
        &self,
        items: Vec<RankedItem>,
        source: &SourceTag,
        weight: f64,
    ) -> Vec<NormalizedItem> {
        let scores = self.scores(&items);

        items
            .into_iter()
            .zip(scores)
            .enumerate()
            .map(|(rank, (item, normalized_score))| NormalizedItem {
                item,
                normalized_score,
                rank,
                source: source.clone(),
                weight,
            })
            .collect()
    }
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self {
            mode: NormalizationMode::ReciprocalRank,
            rrf_k: DEFAULT_RRF_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round5(x: f64) -> f64 {
        (x * 1e5).round() / 1e5
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("rrf".parse::<NormalizationMode>().unwrap(), NormalizationMode::ReciprocalRank);
        assert_eq!(
            " Relative_Score ".parse::<NormalizationMode>().unwrap(),
            NormalizationMode::RelativeScore
        );
        assert_eq!(
            "dist_based_score".parse::<NormalizationMode>().unwrap(),
            NormalizationMode::DistributionBased
        );
        assert!(matches!(
            "borda".parse::<NormalizationMode>(),
            Err(FuseError::InvalidNormalizationMode { .. })
        ));
    }

    #[test]
    fn test_mode_display_roundtrip() {
        for mode in [
            NormalizationMode::ReciprocalRank,
            NormalizationMode::RelativeScore,
            NormalizationMode::DistributionBased,
        ] {
            assert_eq!(mode.to_string().parse::<NormalizationMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_reciprocal_rank_k60() {
        let scores = reciprocal_rank_scores(3, DEFAULT_RRF_K);
        assert_eq!(round5(scores[0]), 0.01639);
        assert_eq!(round5(scores[1]), 0.01613);
        assert_eq!(round5(scores[2]), 0.01587);
        assert!(scores[0] > scores[1] && scores[1] > scores[2]);
    }

    #[test]
    fn test_relative_scores() {
        let scores = relative_scores(&[0.8, 0.3]);
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.3 / 0.8);
    }

    #[test]
    fn test_relative_zero_max() {
        assert_eq!(relative_scores(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert_eq!(relative_scores(&[-1.0, -2.0]), vec![0.0, 0.0]);
        assert!(relative_scores(&[]).is_empty());
    }

    #[test]
    fn test_relative_negative_scores_clamped() {
        assert_eq!(relative_scores(&[2.0, -1.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_distribution_constant_list() {
        assert_eq!(distribution_scores(&[0.4, 0.4, 0.4]), vec![0.5, 0.5, 0.5]);
        assert_eq!(distribution_scores(&[7.0]), vec![0.5]);
    }

    #[test]
    fn test_distribution_symmetric() {
        // mean 2, population std sqrt(2/3)
        let scores = distribution_scores(&[3.0, 2.0, 1.0]);
        let expected_high = 1.0 / (1.0 + (-1.224744871391589f64).exp());
        assert!((scores[0] - expected_high).abs() < 1e-12);
        assert!((scores[1] - 0.5).abs() < 1e-12);
        assert!((scores[0] + scores[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_distribution_extreme_magnitudes() {
        let scores = distribution_scores(&[1e308, 1e308, 1.0]);
        assert!(scores.iter().all(|s| s.is_finite()));
        assert!(scores[0] > 0.5);
        assert_eq!(scores[0], scores[1]);
        assert!(scores[2] < 0.5);

        let spread = distribution_scores(&[-1.7e308, 0.0, 1.7e308]);
        assert!(spread[0] < 0.5 && spread[2] > 0.5);
        assert!((spread[1] - 0.5).abs() < 1e-12);

        assert_eq!(distribution_scores(&[f64::MAX, f64::MAX]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_normalize_tags_source_and_rank() {
        let normalizer = ScoreNormalizer::new(NormalizationMode::RelativeScore, DEFAULT_RRF_K).unwrap();
        let items = vec![RankedItem::new("x", 0.9, "x"), RankedItem::new("y", 0.5, "y")];
        let source = SourceTag::new(2, "bm25");

        let normalized = normalizer.normalize(items, &source, 1.0);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].normalized_score, 1.0);
        assert_eq!(normalized[1].rank, 1);
        assert_eq!(normalized[1].source, source);
    }

    #[test]
    fn test_invalid_rrf_k() {
        assert!(ScoreNormalizer::new(NormalizationMode::ReciprocalRank, -1.0).is_err());
        assert!(ScoreNormalizer::new(NormalizationMode::ReciprocalRank, f64::NAN).is_err());
        assert!(ScoreNormalizer::new(NormalizationMode::ReciprocalRank, 0.0).is_ok());
    }

    proptest! {
        #[test]
        fn prop_relative_in_unit_interval(raw in prop::collection::vec(-1e6f64..1e6, 0..50)) {
            for s in relative_scores(&raw) {
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }

        #[test]
        fn prop_distribution_in_unit_interval(raw in prop::collection::vec(-1e6f64..1e6, 0..50)) {
            for s in distribution_scores(&raw) {
                prop_assert!((0.0..=1.0).contains(&s));
            }
        }

        #[test]
        fn prop_reciprocal_strictly_decreasing(len in 1usize..200, k in 0.0f64..500.0) {
            let scores = reciprocal_rank_scores(len, k);
            prop_assert!(scores.iter().all(|s| *s > 0.0));
            for pair in scores.windows(2) {
                prop_assert!(pair[0] > pair[1]);
            }
        }
    }
}
