//! rankfuse - multi-retriever rank fusion
//!
//! Runs dense (HNSW) and sparse (BM25) retrieval over a corpus for one or
//! more query variants, normalizes each ranked list and fuses them into a
//! single ranking with per-source score breakdowns.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod retrieval;

pub use error::{FuseError, Result};
