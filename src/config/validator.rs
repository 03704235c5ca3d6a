use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{FuseError, Result, ValidationError};
use crate::retrieval::NormalizationMode;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every failure
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_fusion(config, &mut errors);
        Self::validate_keyword(config, &mut errors);
        Self::validate_vector(config, &mut errors);
        Self::validate_concurrency(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FuseError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_fusion(config: &Config, errors: &mut Vec<ValidationError>) {
        let fusion = &config.fusion;

        if fusion.mode.parse::<NormalizationMode>().is_err() {
            errors.push(ValidationError::new(
                "fusion.mode",
                format!("Unknown normalization mode: {}", fusion.mode),
            ));
        }

        if !fusion.rrf_k.is_finite() || fusion.rrf_k < 0.0 {
            errors.push(ValidationError::new(
                "fusion.rrf_k",
                "RRF K must be a finite, non-negative number",
            ));
        }

        if fusion.top_k == 0 {
            errors.push(ValidationError::new(
                "fusion.top_k",
                "top_k must be greater than 0",
            ));
        }

        if fusion.candidate_k == Some(0) {
            errors.push(ValidationError::new(
                "fusion.candidate_k",
                "candidate_k must be greater than 0",
            ));
        }

        for (name, weight) in &fusion.weights {
            if !weight.is_finite() || *weight <= 0.0 {
                errors.push(ValidationError::new(
                    format!("fusion.weights.{}", name),
                    format!("Weight must be positive, got {}", weight),
                ));
            }
        }
    }

    fn validate_keyword(config: &Config, errors: &mut Vec<ValidationError>) {
        if !config.keyword.min_score.is_finite() {
            errors.push(ValidationError::new(
                "keyword.min_score",
                "min_score must be finite",
            ));
        }

        // Tantivy refuses budgets below 15MB per writer thread
        if config.keyword.writer_memory_bytes < 15_000_000 {
            errors.push(ValidationError::new(
                "keyword.writer_memory_bytes",
                "Writer memory must be at least 15000000 bytes",
            ));
        }
    }

    fn validate_vector(config: &Config, errors: &mut Vec<ValidationError>) {
        let vector = &config.vector;

        if vector.dimension == 0 {
            errors.push(ValidationError::new(
                "vector.dimension",
                "Dimension must be greater than 0",
            ));
        }

        if vector.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "vector.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if vector.ef_construction == 0 || vector.ef_search == 0 {
            errors.push(ValidationError::new(
                "vector.ef_search",
                "HNSW ef parameters must be greater than 0",
            ));
        }

        if !(-1.0..=1.0).contains(&vector.min_similarity) {
            errors.push(ValidationError::new(
                "vector.min_similarity",
                "Cosine similarity threshold must be within [-1, 1]",
            ));
        }
    }

    fn validate_concurrency(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.concurrency.retrieval_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "concurrency.retrieval_timeout_ms",
                "Timeout must be greater than 0",
            ));
        }
    }
}
