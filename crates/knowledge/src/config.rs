//! Knowledge settings derived from the application configuration.

use crate::embeddings::EmbeddingConfig;
use crate::engine::EngineOptions;
use crate::pool::DocumentPool;
use crate::rag::RetrievalOptions;
use grounded_core::AppConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the knowledge crate needs from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct KnowledgeSettings {
    /// Document pool root, already resolved against the workspace
    pub data_dir: PathBuf,
    pub embedding: EmbeddingConfig,
    pub engine: EngineOptions,
}

impl KnowledgeSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            data_dir: config.resolved_data_dir(),
            embedding: EmbeddingConfig::from(&config.embedding),
            engine: EngineOptions {
                retrieval: RetrievalOptions {
                    top_k: config.retrieval.top_k,
                    max_distance: config.retrieval.max_distance,
                },
                build_timeout: Duration::from_secs(config.limits.build_timeout_secs),
                query_timeout: Duration::from_secs(config.limits.query_timeout_secs),
            },
        }
    }

    pub fn pool(&self) -> DocumentPool {
        DocumentPool::new(&self.data_dir)
    }
}
