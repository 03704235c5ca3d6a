//! Configuration management for rankfuse
//!
//! Settings are loaded from TOML, overridden from `RANKFUSE_*` environment
//! variables and validated before use. Every section has defaults, so a
//! partial file is enough.

use crate::error::{FuseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version understood by this build
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub fusion: FusionSettings,
    #[serde(default)]
    pub keyword: KeywordSettings,
    #[serde(default)]
    pub vector: VectorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub concurrency: ConcurrencySettings,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Fusion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Normalization mode name ("reciprocal_rank", "relative_score", "distribution_based")
    pub mode: String,
    /// RRF K constant (typically 60)
    pub rrf_k: f64,
    /// Number of fused results to return
    pub top_k: usize,
    /// Per-retriever fetch size (defaults to top_k)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_k: Option<usize>,
    /// Retriever name -> fusion weight
    pub weights: HashMap<String, f64>,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            mode: "reciprocal_rank".to_string(),
            rrf_k: 60.0,
            top_k: 10,
            candidate_k: None,
            weights: HashMap::new(),
        }
    }
}

impl FusionSettings {
    /// Weight configured for a retriever, 1.0 when unset
    pub fn weight_for(&self, retriever: &str) -> f64 {
        self.weights.get(retriever).copied().unwrap_or(1.0)
    }
}

/// BM25 keyword retriever settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    /// Results must score strictly above this
    pub min_score: f64,
    /// Tantivy writer memory budget
    pub writer_memory_bytes: usize,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            writer_memory_bytes: 50_000_000,
        }
    }
}

/// Vector retriever settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    pub dimension: usize,
    pub hnsw_m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    /// Results must have cosine similarity strictly above this
    pub min_similarity: f64,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            dimension: 256,
            hnsw_m: 16,
            ef_construction: 200,
            ef_search: 64,
            min_similarity: 0.0,
        }
    }
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached queries (0 disables caching)
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Concurrent retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencySettings {
    pub retrieval_timeout_ms: u64,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            retrieval_timeout_ms: 5000,
        }
    }
}

impl ConcurrencySettings {
    pub fn retrieval_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retrieval_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FuseError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FuseError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;

        let mut config = Self::from_toml_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse configuration from TOML text without env overrides or validation
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| FuseError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: RANKFUSE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("RANKFUSE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "FUSION__MODE" => {
                self.fusion.mode = value.to_string();
            }
            "FUSION__TOP_K" => {
                self.fusion.top_k = parse_env(path, value)?;
            }
            "FUSION__RRF_K" => {
                self.fusion.rrf_k = parse_env(path, value)?;
            }
            "FUSION__CANDIDATE_K" => {
                self.fusion.candidate_k = Some(parse_env(path, value)?);
            }
            "CACHE__CAPACITY" => {
                self.cache.capacity = parse_env(path, value)?;
            }
            "CONCURRENCY__RETRIEVAL_TIMEOUT_MS" => {
                self.concurrency.retrieval_timeout_ms = parse_env(path, value)?;
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FuseError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("rankfuse").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| FuseError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
        assert_eq!(config.fusion.top_k, 10);
        assert_eq!(config.fusion.rrf_k, 60.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [fusion]
            mode = "relative_score"
            top_k = 3

            [fusion.weights]
            bm25 = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.fusion.mode, "relative_score");
        assert_eq!(config.fusion.top_k, 3);
        assert_eq!(config.fusion.rrf_k, 60.0);
        assert_eq!(config.fusion.weight_for("bm25"), 0.5);
        assert_eq!(config.fusion.weight_for("vector"), 1.0);
        assert_eq!(config.cache.capacity, 256);
        assert_eq!(config.meta.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.fusion.mode = "distribution_based".to_string();
        config.fusion.candidate_k = Some(20);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.fusion.candidate_k, Some(20));
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(&temp.path().join("nope.toml"));
        assert!(matches!(result, Err(FuseError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config.set_value_from_env("FUSION__TOP_K", "7").unwrap();
        config.set_value_from_env("FUSION__MODE", "rrf").unwrap();
        assert_eq!(config.fusion.top_k, 7);
        assert_eq!(config.fusion.mode, "rrf");

        let err = config.set_value_from_env("CACHE__CAPACITY", "lots");
        assert!(matches!(err, Err(FuseError::InvalidConfigValue { .. })));
        assert_eq!(config.cache.capacity, 256);
    }
}
