//! Retrieval and grounded answering.
//!
//! Evidence is retrieved by embedding distance and answers are assembled from
//! that evidence alone.

pub mod answer;
pub mod retrieve;
pub mod types;

pub use answer::compose;
pub use retrieve::{MetricsSnapshot, RetrievalMetrics, RetrievalOptions, Retriever};
pub use types::{Answer, RetrievedEvidence};
