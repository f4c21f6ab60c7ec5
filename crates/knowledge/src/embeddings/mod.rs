//! Embedding engine.
//!
//! The [`Embedder`] is a long-lived handle around one provider. It is created
//! once at startup (model loading is expensive) and cloned into whatever needs
//! to embed text, so build and query always use the same model.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use grounded_core::{AppError, AppResult};
use std::sync::Arc;

/// Shared embedding handle.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    normalize: bool,
    batch_size: usize,
}

impl Embedder {
    /// Wrap an already-created provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, normalize: bool) -> Self {
        Self {
            provider,
            normalize,
            batch_size: 64,
        }
    }

    /// Load the configured provider once and wrap it.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config).await?;

        tracing::info!(
            "Embedding model ready: provider={}, model={}, dimensions={}",
            provider.provider_name(),
            provider.model_name(),
            provider.dimensions()
        );

        Ok(Self {
            provider,
            normalize: config.normalize,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Override the batch size used when talking to the provider.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed texts, one vector per input, all of [`Embedder::dimensions`] length.
    ///
    /// A provider that returns the wrong number of vectors or a vector of the
    /// wrong length is reported as [`AppError::Embedding`].
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dimensions = self.dimensions();
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(AppError::Embedding(format!(
                    "Provider '{}' returned {} vectors for {} texts",
                    self.provider_name(),
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);

            // Let deadlines and other tasks run between batches.
            tokio::task::yield_now().await;
        }

        for vector in &mut embeddings {
            if vector.len() != dimensions {
                return Err(AppError::Embedding(format!(
                    "Provider '{}' returned a {}-dimensional vector, expected {}",
                    self.provider_name(),
                    vector.len(),
                    dimensions
                )));
            }
            if self.normalize {
                normalize(vector);
            }
        }

        tracing::debug!(
            "Generated {} embeddings of dimension {}",
            embeddings.len(),
            dimensions
        );

        Ok(embeddings)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}
