//! Vector index abstraction and the flat L2 index used for document evidence.
//!
//! Ids are insertion positions, so id `i` corresponds to the `i`-th document
//! the index was built from.

use crate::embeddings::Embedder;
use crate::progress::ProgressReporter;
use crate::types::Document;
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One search hit. Slots with no match are simply not returned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position of the matched vector
    pub id: usize,

    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Trait for vector index backends.
///
/// Implementations are read-only once built and may be searched from many
/// threads at once.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored vector has.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `k` nearest vectors, ordered by ascending distance.
    ///
    /// An empty index yields an empty result.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>>;
}

/// Exhaustive squared-L2 index over contiguous storage.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            data: Vec::new(),
        }
    }

    /// Append a vector and return its id.
    pub fn add(&mut self, vector: &[f32]) -> AppResult<usize> {
        if vector.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimensions
            )));
        }

        let id = self.len();
        self.data.extend_from_slice(vector);
        Ok(id)
    }

    /// Embed every document's content and index the vectors in document order.
    ///
    /// Fails with [`AppError::EmptyCorpus`] when `documents` is empty.
    pub async fn build(
        embedder: &Embedder,
        documents: &[Document],
        progress: &ProgressReporter,
    ) -> AppResult<Self> {
        if documents.is_empty() {
            return Err(AppError::EmptyCorpus);
        }

        let total = documents.len() as u64;
        progress.embed(0, Some(total), embedder.model_name());

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        progress.embed(total, Some(total), embedder.model_name());

        let mut index = Self::new(embedder.dimensions());
        index.data.reserve(vectors.len() * index.dimensions);
        for vector in &vectors {
            index.add(vector)?;
        }

        progress.index(index.len() as u64, Some(total));

        if index.len() != documents.len() {
            return Err(AppError::Index(format!(
                "Indexed {} vectors for {} documents",
                index.len(),
                documents.len()
            )));
        }

        Ok(index)
    }

    fn vector(&self, id: usize) -> &[f32] {
        let start = id * self.dimensions;
        &self.data[start..start + self.dimensions]
    }
}

impl VectorIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.data.len() / self.dimensions
        }
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimensions {
            return Err(AppError::Index(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut neighbors: Vec<Neighbor> = (0..self.len())
            .map(|id| Neighbor {
                id,
                distance: squared_l2(query, self.vector(id)),
            })
            .collect();

        // Stable on ties: equal distances keep insertion order.
        neighbors.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingConfig;
    use crate::types::DocumentType;

    fn index_of(vectors: &[[f32; 2]]) -> FlatIndex {
        let mut index = FlatIndex::new(2);
        for v in vectors {
            index.add(v).unwrap();
        }
        index
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = index_of(&[[5.0, 5.0], [0.0, 0.1], [1.0, 1.0], [0.0, 0.0]]);

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|n| n.id).collect();

        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(hits[0].distance, 0.0);
        assert!((hits[2].distance - 2.0).abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_fewer_entries_than_k() {
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0]]);
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|n| n.id < 2));
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = FlatIndex::new(2);
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_k_zero() {
        let index = index_of(&[[1.0, 0.0]]);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]]);
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(2);
        assert!(matches!(index.add(&[1.0]), Err(AppError::Index(_))));

        index.add(&[1.0, 1.0]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 1.0, 1.0], 1),
            Err(AppError::Index(_))
        ));
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[1.0, 2.0], &[4.0, 6.0]), 25.0);
    }

    #[tokio::test]
    async fn test_build_rejects_empty_corpus() {
        let embedder = Embedder::from_config(&EmbeddingConfig::default())
            .await
            .unwrap();
        let result = FlatIndex::build(&embedder, &[], &ProgressReporter::noop()).await;
        assert!(matches!(result, Err(AppError::EmptyCorpus)));
    }

    #[tokio::test]
    async fn test_build_indexes_every_document() {
        let embedder = Embedder::from_config(&EmbeddingConfig::default())
            .await
            .unwrap();
        let documents = vec![
            Document::new("The sky is blue", "a.pdf", DocumentType::Pdf),
            Document::new("Grass is green", "b.png", DocumentType::Image),
            Document::new("Roses are red", "c.wav", DocumentType::Audio),
        ];

        let index = FlatIndex::build(&embedder, &documents, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(index.len(), documents.len());
        assert_eq!(index.dimensions(), 384);

        let query = embedder.embed_one("The sky is blue").await.unwrap();
        let hits = index.search(&query, 3).unwrap();
        assert_eq!(hits[0].id, 0);
        assert!(hits[0].distance < 1e-6);
    }
}
