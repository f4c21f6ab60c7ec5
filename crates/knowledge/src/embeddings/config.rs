//! Embedding configuration types.

use grounded_core::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};

/// Embedding configuration for the process-wide embedder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram", "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum number of texts sent to the provider at once
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint (ollama)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds (ollama)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            normalize: true,
            batch_size: default_batch_size(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            normalize: settings.normalize,
            batch_size: default_batch_size(),
            endpoint: settings.endpoint.clone(),
            timeout_secs: settings.timeout_secs,
        }
    }
}
