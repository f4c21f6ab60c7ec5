//! Grounded knowledge base.
//!
//! Documents from the on-disk pool are embedded into a flat L2 index. Queries
//! retrieve the nearest documents within a confidence threshold and are
//! answered only with that evidence, or refused.
//!
//! ```text
//! DocumentPool -> Ingestor -> Embedder -> FlatIndex -> Snapshot (published)
//! query -> Embedder -> FlatIndex::search -> filter -> compose -> Answer
//! ```

pub mod config;
pub mod embeddings;
pub mod engine;
pub mod ingest;
pub mod pool;
pub mod progress;
pub mod rag;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use config::KnowledgeSettings;
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider};
pub use engine::{EngineOptions, EngineStatus, KnowledgeEngine, Snapshot};
pub use ingest::{ContentExtractor, ExtractorFactory, Extraction, Ingestor, SidecarExtractor};
pub use pool::DocumentPool;
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{Answer, MetricsSnapshot, RetrievalOptions, RetrievedEvidence, Retriever};
pub use types::{BuildStats, Document, DocumentType, FileCounts, Readiness, Segment};
pub use vector_index::{FlatIndex, Neighbor, VectorIndex};
