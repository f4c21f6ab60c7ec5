//! Trigram embedding provider: deterministic, offline, content-aware vectors.

use crate::embeddings::provider::EmbeddingProvider;
use grounded_core::{AppError, AppResult};
use std::collections::BTreeMap;

const MODEL_NAME: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "how", "does", "did", "do",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Each salient word contributes to a handful of hashed dimensions: one per
/// character trigram plus one for the whole word. Identical text always
/// produces an identical vector, and texts sharing vocabulary land close to
/// each other. It is not a neural sentence model, but it needs no download.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

/// Hash one text into a unit-length vector. Pure CPU work.
fn embed_text(text: &str, dimensions: usize) -> Vec<f32> {
    let mut embedding = vec![0.0f32; dimensions];

    for (word, freq) in word_frequencies(text) {
        let chars: Vec<char> = word.chars().collect();
        for window in chars.windows(3) {
            let idx = bucket(fold_hash(window.iter().collect::<String>().as_bytes(), 37), dimensions);
            embedding[idx] += (freq as f32).sqrt();
        }

        let idx = bucket(fold_hash(word.as_bytes(), 31), dimensions);
        embedding[idx] += freq as f32;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut embedding {
            *v /= norm;
        }
    }

    embedding
}

/// Lowercased alphanumeric words with their counts.
///
/// Stop words and words shorter than three characters are dropped, unless
/// that would leave nothing, in which case every word is kept.
fn word_frequencies(text: &str) -> BTreeMap<String, u32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let salient: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .collect();

    let chosen = if salient.is_empty() { words } else { salient };

    let mut freq = BTreeMap::new();
    for word in chosen {
        *freq.entry(word.to_string()).or_insert(0) += 1;
    }
    freq
}

fn fold_hash(bytes: &[u8], multiplier: u64) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(multiplier).wrapping_add(b as u64))
}

fn bucket(hash: u64, dimensions: usize) -> usize {
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Hashing runs on the blocking pool so long batches neither stall a
    /// runtime worker nor hide a pending deadline from the caller.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let texts = texts.to_vec();
        let dimensions = self.dimensions;

        tokio::task::spawn_blocking(move || {
            texts
                .iter()
                .map(|text| embed_text(text, dimensions))
                .collect::<Vec<Vec<f32>>>()
        })
        .await
        .map_err(|e| AppError::Embedding(format!("Trigram embedding task failed: {}", e)))
    }
}
