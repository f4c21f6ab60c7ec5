//! Evidence retrieval: embed the query, search the index, drop weak matches.

use crate::embeddings::Embedder;
use crate::rag::types::RetrievedEvidence;
use crate::types::Document;
use crate::vector_index::{Neighbor, VectorIndex};
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default number of neighbors requested from the index.
pub const DEFAULT_TOP_K: usize = 3;

/// Default confidence threshold (squared L2). Lower is stricter.
pub const DEFAULT_MAX_DISTANCE: f32 = 1.5;

/// Search options for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOptions {
    pub top_k: usize,
    pub max_distance: f32,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

/// Process-wide retrieval counters, for threshold tuning.
#[derive(Debug, Default)]
pub struct RetrievalMetrics {
    queries: AtomicU64,
    refusals: AtomicU64,
    discarded: AtomicU64,
}

/// Point-in-time copy of [`RetrievalMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub refusals: u64,
    pub discarded: u64,
}

impl RetrievalMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            refusals: self.refusals.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    fn record(&self, discarded: usize, empty: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.discarded.fetch_add(discarded as u64, Ordering::Relaxed);
        if empty {
            self.refusals.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Query-side half of the pipeline.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Embedder,
    options: RetrievalOptions,
    metrics: Arc<RetrievalMetrics>,
}

impl Retriever {
    pub fn new(embedder: Embedder, options: RetrievalOptions) -> Self {
        Self {
            embedder,
            options,
            metrics: Arc::new(RetrievalMetrics::default()),
        }
    }

    pub fn options(&self) -> RetrievalOptions {
        self.options
    }

    pub fn metrics(&self) -> &Arc<RetrievalMetrics> {
        &self.metrics
    }

    /// Retrieve evidence for `query`, closest first.
    ///
    /// `documents[i]` must be the document indexed under id `i`. An empty
    /// result is the refusal trigger, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        index: &dyn VectorIndex,
        documents: &[Document],
    ) -> AppResult<Vec<RetrievedEvidence>> {
        if index.is_empty() {
            tracing::info!("Index is empty, nothing to retrieve");
            self.metrics.record(0, true);
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_one(query).await?;

        // A text with no usable words embeds to the origin, which is
        // equidistant from every unit vector and would match all of them.
        if query_vector.iter().all(|&x| x == 0.0) {
            tracing::info!("Query produced an empty embedding, nothing to retrieve");
            self.metrics.record(0, true);
            return Ok(Vec::new());
        }

        let neighbors = index.search(&query_vector, self.options.top_k)?;
        let candidates = neighbors.len();
        let kept = filter_by_distance(neighbors, self.options.max_distance);
        let discarded = candidates - kept.len();

        let mut evidence = Vec::with_capacity(kept.len());
        for neighbor in kept {
            let document = documents.get(neighbor.id).ok_or_else(|| {
                AppError::Index(format!(
                    "Index returned id {} but only {} documents are loaded",
                    neighbor.id,
                    documents.len()
                ))
            })?;
            evidence.push(RetrievedEvidence {
                document: document.clone(),
                distance: neighbor.distance,
            });
        }

        self.metrics.record(discarded, evidence.is_empty());

        tracing::info!(
            candidates,
            kept = evidence.len(),
            discarded,
            top_distance = ?evidence.first().map(|e| e.distance),
            "Retrieved evidence"
        );

        Ok(evidence)
    }
}

/// Keep neighbors within `max_distance`, preserving order.
///
/// Each discarded candidate is logged at debug level.
pub fn filter_by_distance(neighbors: Vec<Neighbor>, max_distance: f32) -> Vec<Neighbor> {
    neighbors
        .into_iter()
        .filter(|n| {
            let keep = n.distance <= max_distance;
            if !keep {
                tracing::debug!(
                    id = n.id,
                    distance = n.distance,
                    max_distance,
                    "Low confidence match ignored"
                );
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingConfig;
    use crate::progress::ProgressReporter;
    use crate::types::DocumentType;
    use crate::vector_index::FlatIndex;

    async fn embedder() -> Embedder {
        Embedder::from_config(&EmbeddingConfig::default())
            .await
            .unwrap()
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("The sky is blue", "a.pdf", DocumentType::Pdf),
            Document::new("Quarterly invoice totals for March", "b.pdf", DocumentType::Pdf),
            Document::new("Sky: blue", "c.png", DocumentType::Image),
            Document::new("Meeting notes about the garden shed", "d.wav", DocumentType::Audio),
        ]
    }

    #[test]
    fn test_filter_by_distance() {
        let neighbors = vec![
            Neighbor { id: 2, distance: 0.1 },
            Neighbor { id: 0, distance: 1.5 },
            Neighbor { id: 1, distance: 1.6 },
        ];

        let kept = filter_by_distance(neighbors, 1.5);
        let ids: Vec<usize> = kept.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 0]);
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first() {
        let embedder = embedder().await;
        let documents = corpus();
        let index = FlatIndex::build(&embedder, &documents, &ProgressReporter::noop())
            .await
            .unwrap();
        let retriever = Retriever::new(embedder, RetrievalOptions::default());

        let evidence = retriever
            .retrieve("The sky is blue", &index, &documents)
            .await
            .unwrap();

        assert!(!evidence.is_empty());
        assert_eq!(evidence[0].document.source, "a.pdf");
        assert!(evidence[0].distance < 1e-4);
        assert!(evidence.len() <= DEFAULT_TOP_K);
        assert!(evidence.iter().all(|e| e.distance <= DEFAULT_MAX_DISTANCE));
        assert!(evidence.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_strict_threshold_discards_everything() {
        let embedder = embedder().await;
        let documents = corpus();
        let index = FlatIndex::build(&embedder, &documents, &ProgressReporter::noop())
            .await
            .unwrap();
        let retriever = Retriever::new(
            embedder,
            RetrievalOptions {
                top_k: 3,
                max_distance: 0.01,
            },
        );

        let evidence = retriever
            .retrieve("volcanic basalt formations", &index, &documents)
            .await
            .unwrap();

        assert!(evidence.is_empty());
        let metrics = retriever.metrics().snapshot();
        assert_eq!(metrics.queries, 1);
        assert_eq!(metrics.refusals, 1);
        assert_eq!(metrics.discarded, 3);
    }

    #[tokio::test]
    async fn test_empty_index_returns_no_evidence() {
        let retriever = Retriever::new(embedder().await, RetrievalOptions::default());
        let index = FlatIndex::new(384);

        let evidence = retriever.retrieve("anything", &index, &[]).await.unwrap();
        assert!(evidence.is_empty());
    }

    #[tokio::test]
    async fn test_wordless_query_returns_no_evidence() {
        let embedder = embedder().await;
        let documents = corpus();
        let index = FlatIndex::build(&embedder, &documents, &ProgressReporter::noop())
            .await
            .unwrap();
        let retriever = Retriever::new(embedder, RetrievalOptions::default());

        let evidence = retriever.retrieve("?!", &index, &documents).await.unwrap();
        assert!(evidence.is_empty());
    }

    #[tokio::test]
    async fn test_missing_document_is_index_error() {
        let embedder = embedder().await;
        let documents = corpus();
        let index = FlatIndex::build(&embedder, &documents, &ProgressReporter::noop())
            .await
            .unwrap();
        let retriever = Retriever::new(embedder, RetrievalOptions::default());

        let err = retriever
            .retrieve("The sky is blue", &index, &documents[..0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Index(_)));
    }
}
