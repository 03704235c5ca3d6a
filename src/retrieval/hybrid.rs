//! Multi-query, multi-retriever fusion pipeline
//!
//! retrieve -> normalize -> fuse, once per logical query. Every
//! configuration problem is reported before any retriever is called.

use crate::config::{Config, ConcurrencySettings, FusionSettings};
use crate::error::{FuseError, Result};
use crate::retrieval::{
    FusedResult, FusionCombiner, NormalizationMode, RankedItem, RetrievalError,
    RetrieverAdapter, ScoreNormalizer, SourceTag, DEFAULT_RRF_K,
};
use std::time::Duration;
use tokio::task::JoinSet;

/// Validated fusion parameters
#[derive(Debug, Clone, PartialEq)]
pub struct FusionOptions {
    normalizer: ScoreNormalizer,
    top_k: usize,
    candidate_k: usize,
}

impl FusionOptions {
    /// Options with the default RRF K and `candidate_k = top_k`
    pub fn new(mode: NormalizationMode, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(FuseError::InvalidTopK);
        }

        Ok(Self {
            normalizer: ScoreNormalizer::new(mode, DEFAULT_RRF_K)?,
            top_k,
            candidate_k: top_k,
        })
    }

    /// Parse the mode name, failing fast on unknown modes
    pub fn parse(mode: &str, top_k: usize) -> Result<Self> {
        Self::new(mode.parse()?, top_k)
    }

    pub fn with_rrf_k(mut self, rrf_k: f64) -> Result<Self> {
        self.normalizer = ScoreNormalizer::new(self.normalizer.mode(), rrf_k)?;
        Ok(self)
    }

    /// Number of candidates requested from each retriever
    pub fn with_candidate_k(mut self, candidate_k: usize) -> Result<Self> {
        if candidate_k == 0 {
            return Err(FuseError::InvalidConfigValue {
                path: "fusion.candidate_k".to_string(),
                message: "candidate_k must be greater than 0".to_string(),
            });
        }
        self.candidate_k = candidate_k;
        Ok(self)
    }

    pub fn from_settings(settings: &FusionSettings) -> Result<Self> {
        let options = Self::parse(&settings.mode, settings.top_k)?.with_rrf_k(settings.rrf_k)?;
        match settings.candidate_k {
            Some(candidate_k) => options.with_candidate_k(candidate_k),
            None => Ok(options),
        }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.normalizer.mode()
    }

    pub fn rrf_k(&self) -> f64 {
        self.normalizer.rrf_k()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn candidate_k(&self) -> usize {
        self.candidate_k
    }
}

/// Fuses results of several retrievers across query variants
pub struct RankFusion {
    options: FusionOptions,
    retrievers: Vec<RetrieverAdapter>,
    retrieval_timeout: Duration,
}

impl RankFusion {
    pub fn new(options: FusionOptions, retrievers: Vec<RetrieverAdapter>) -> Self {
        Self {
            options,
            retrievers,
            retrieval_timeout: ConcurrencySettings::default().retrieval_timeout(),
        }
    }

    /// Options, weights and timeout all taken from `config`
    pub fn from_config(config: &Config, retrievers: Vec<RetrieverAdapter>) -> Result<Self> {
        let fusion = Self::new(FusionOptions::from_settings(&config.fusion)?, retrievers)
            .with_settings_weights(&config.fusion)?
            .with_retrieval_timeout(config.concurrency.retrieval_timeout());
        Ok(fusion)
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    pub fn retrieval_timeout(&self) -> Duration {
        self.retrieval_timeout
    }

    /// Apply configured weights by retriever name
    pub fn with_settings_weights(mut self, settings: &FusionSettings) -> Result<Self> {
        self.retrievers = self
            .retrievers
            .into_iter()
            .map(|adapter| {
                let weight = settings.weight_for(adapter.name());
                adapter.with_weight(weight)
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    pub fn retrievers(&self) -> &[RetrieverAdapter] {
        &self.retrievers
    }

    /// Retrieve, normalize and fuse sequentially
    pub fn fuse<S: AsRef<str>>(&self, query_variants: &[S]) -> Result<Vec<FusedResult>> {
        validate_queries(query_variants)?;

        let mut lists = Vec::with_capacity(query_variants.len() * self.retrievers.len());
        for (query_index, query) in query_variants.iter().enumerate() {
            for (slot, adapter) in self.retrievers.iter().enumerate() {
                let items = adapter.retrieve(query.as_ref(), self.options.candidate_k);
                lists.push((query_index, slot, items));
            }
        }

        Ok(self.combine(lists))
    }

    /// [`fuse_concurrent`](Self::fuse_concurrent) with the configured retrieval timeout
    pub async fn fuse_async<S: AsRef<str>>(&self, query_variants: &[S]) -> Result<Vec<FusedResult>> {
        self.fuse_concurrent(query_variants, self.retrieval_timeout).await
    }

    /// Retrieve concurrently, then normalize and fuse in the same order as [`fuse`](Self::fuse)
    ///
    /// A retrieval that panics or outlives `timeout` contributes no items.
    pub async fn fuse_concurrent<S: AsRef<str>>(
        &self,
        query_variants: &[S],
        timeout: Duration,
    ) -> Result<Vec<FusedResult>> {
        validate_queries(query_variants)?;

        let k = self.options.candidate_k;
        let mut tasks = JoinSet::new();

        for (query_index, query) in query_variants.iter().enumerate() {
            for (slot, adapter) in self.retrievers.iter().enumerate() {
                let adapter = adapter.clone();
                let query = query.as_ref().to_string();
                tasks.spawn(async move {
                    let name = adapter.name().to_string();
                    let handle = tokio::task::spawn_blocking(move || adapter.retrieve(&query, k));

                    let items = match tokio::time::timeout(timeout, handle).await {
                        Ok(Ok(items)) => items,
                        Ok(Err(e)) => {
                            tracing::warn!("Retriever '{}' task failed: {}", name, e);
                            Vec::new()
                        }
                        Err(_) => {
                            let e = RetrievalError::Timeout(timeout);
                            tracing::warn!("Retriever '{}' failed, treating as no results: {}", name, e);
                            Vec::new()
                        }
                    };
                    (query_index, slot, items)
                });
            }
        }

        let mut lists = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(list) => lists.push(list),
                Err(e) => tracing::warn!("Retrieval task aborted: {}", e),
            }
        }

        Ok(self.combine(lists))
    }

    /// Normalize each list and fuse them in (query, retriever) order
    fn combine(&self, mut lists: Vec<(usize, usize, Vec<RankedItem>)>) -> Vec<FusedResult> {
        lists.sort_by_key(|(query_index, slot, _)| (*query_index, *slot));

        let mut combiner = FusionCombiner::new();
        for (query_index, slot, items) in lists {
            let adapter = &self.retrievers[slot];
            let source = SourceTag::new(query_index, adapter.name());
            combiner.extend(
                self.options
                    .normalizer
                    .normalize(items, &source, adapter.weight()),
            );
        }

        tracing::debug!(
            "Fused {} distinct items with {}",
            combiner.len(),
            self.options.mode()
        );

        combiner.finalize(self.options.top_k)
    }
}

fn validate_queries<S: AsRef<str>>(query_variants: &[S]) -> Result<()> {
    if query_variants.is_empty() {
        return Err(FuseError::InvalidQuery(
            "At least one query variant is required".to_string(),
        ));
    }

    if let Some(index) = query_variants
        .iter()
        .position(|q| q.as_ref().trim().is_empty())
    {
        return Err(FuseError::InvalidQuery(format!(
            "Query variant {} is empty",
            index
        )));
    }

    Ok(())
}

/// Fuse `query_variants` across `retrievers` with default RRF K
pub fn fuse<S: AsRef<str>>(
    query_variants: &[S],
    retrievers: &[RetrieverAdapter],
    normalization_mode: NormalizationMode,
    top_k: usize,
) -> Result<Vec<FusedResult>> {
    let options = FusionOptions::new(normalization_mode, top_k)?;
    RankFusion::new(options, retrievers.to_vec()).fuse(query_variants)
}
