//! Knowledge engine: the published snapshot and its lifecycle.
//!
//! One build runs at a time. A build constructs a complete [`Snapshot`] off
//! to the side and publishes it by swapping a single `Arc` under a briefly
//! held write lock. Queries clone that `Arc` and work on it without locks,
//! so they always see one consistent index and document list.
//!
//! Readiness is derived: the engine is ready iff a snapshot is published.
//! Uploads and clears call [`KnowledgeEngine::invalidate`], which unpublishes
//! and bumps an epoch. A build that started before the bump is discarded
//! instead of published.

use crate::config::KnowledgeSettings;
use crate::embeddings::Embedder;
use crate::ingest::Ingestor;
use crate::pool::DocumentPool;
use crate::progress::ProgressReporter;
use crate::rag::{compose, Answer, MetricsSnapshot, RetrievalOptions, RetrievedEvidence, Retriever};
use crate::types::{BuildStats, Document, Readiness};
use crate::vector_index::{FlatIndex, VectorIndex};
use chrono::{DateTime, Utc};
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default deadline for a build.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(300);

/// Default deadline for a query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// An immutable index together with the documents it was built from.
#[derive(Debug)]
pub struct Snapshot {
    build_id: Uuid,
    built_at: DateTime<Utc>,
    index: FlatIndex,
    documents: Vec<Document>,
}

impl Snapshot {
    /// Pair an index with its documents. Id `i` must be `documents[i]`.
    pub fn new(index: FlatIndex, documents: Vec<Document>) -> AppResult<Self> {
        if index.len() != documents.len() {
            return Err(AppError::Index(format!(
                "Index holds {} vectors but {} documents were supplied",
                index.len(),
                documents.len()
            )));
        }

        Ok(Self {
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            index,
            documents,
        })
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

/// Retrieval knobs and deadlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub retrieval: RetrievalOptions,
    pub build_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retrieval: RetrievalOptions::default(),
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Readiness and the published build, as reported by status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub documents_loaded: usize,
    pub build_id: Option<Uuid>,
    pub built_at: Option<DateTime<Utc>>,
}

/// Owns the embedder and the published snapshot.
#[derive(Debug)]
pub struct KnowledgeEngine {
    embedder: Embedder,
    retriever: Retriever,
    options: EngineOptions,
    published: RwLock<Option<Arc<Snapshot>>>,
    build_lock: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
}

impl KnowledgeEngine {
    pub fn new(embedder: Embedder, options: EngineOptions) -> Self {
        let retriever = Retriever::new(embedder.clone(), options.retrieval);

        Self {
            embedder,
            retriever,
            options,
            published: RwLock::new(None),
            build_lock: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Load the configured embedding model and create a not-ready engine.
    pub async fn from_settings(settings: &KnowledgeSettings) -> AppResult<Self> {
        let embedder = Embedder::from_config(&settings.embedding).await?;
        Ok(Self::new(embedder, settings.engine))
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// The currently published snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn readiness(&self) -> Readiness {
        if self.snapshot().is_some() {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }

    pub fn status(&self) -> EngineStatus {
        match self.snapshot() {
            Some(snapshot) => EngineStatus {
                ready: true,
                documents_loaded: snapshot.documents.len(),
                build_id: Some(snapshot.build_id),
                built_at: Some(snapshot.built_at),
            },
            None => EngineStatus {
                ready: false,
                documents_loaded: 0,
                build_id: None,
                built_at: None,
            },
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.retriever.metrics().snapshot()
    }

    /// Unpublish the snapshot and discard any build in flight.
    pub fn invalidate(&self, reason: &str) {
        let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if published.take().is_some() {
            tracing::info!(reason, "Knowledge base invalidated");
        } else {
            tracing::debug!(reason, "Invalidated while not ready");
        }
    }

    /// Build and publish a snapshot from already-ingested documents.
    pub async fn build(&self, documents: Vec<Document>) -> AppResult<BuildStats> {
        self.build_with_progress(documents, &ProgressReporter::noop())
            .await
    }

    pub async fn build_with_progress(
        &self,
        documents: Vec<Document>,
        progress: &ProgressReporter,
    ) -> AppResult<BuildStats> {
        let _guard = self.lock_build()?;
        self.run_build(async { Ok(documents) }, progress).await
    }

    /// Ingest the pool, then build and publish.
    ///
    /// An upload or clear that lands during ingestion supersedes the build.
    pub async fn rebuild_from(
        &self,
        ingestor: &Ingestor,
        pool: &DocumentPool,
        progress: &ProgressReporter,
    ) -> AppResult<BuildStats> {
        let _guard = self.lock_build()?;
        self.run_build(ingestor.ingest(pool, progress), progress)
            .await
    }

    fn lock_build(&self) -> AppResult<tokio::sync::MutexGuard<'_, ()>> {
        self.build_lock.try_lock().map_err(|_| {
            tracing::warn!("Rejected build: another build is running");
            AppError::BuildInProgress
        })
    }

    async fn run_build<F>(&self, documents: F, progress: &ProgressReporter) -> AppResult<BuildStats>
    where
        F: Future<Output = AppResult<Vec<Document>>>,
    {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let started = Instant::now();
        let deadline = self.options.build_timeout;

        let outcome = tokio::time::timeout(deadline, async {
            let documents = documents.await?;
            tracing::info!(documents = documents.len(), "Building knowledge base");
            let index = FlatIndex::build(&self.embedder, &documents, progress).await?;
            Snapshot::new(index, documents)
        })
        .await;

        let snapshot = match outcome {
            Ok(Ok(snapshot)) => Arc::new(snapshot),
            Ok(Err(e)) => {
                self.invalidate("build failed");
                tracing::warn!("Build failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                self.invalidate("build timed out");
                tracing::warn!("Build timed out after {:?}", deadline);
                return Err(AppError::BuildTimeout(deadline));
            }
        };

        {
            let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
            if self.epoch.load(Ordering::SeqCst) != epoch {
                tracing::warn!(
                    build_id = %snapshot.build_id,
                    "Documents changed during build, discarding result"
                );
                return Err(AppError::BuildSuperseded);
            }
            *published = Some(snapshot.clone());
        }

        let stats = BuildStats {
            build_id: snapshot.build_id,
            documents: snapshot.documents.len(),
            dimensions: snapshot.index.dimensions(),
            built_at: snapshot.built_at,
            duration_secs: started.elapsed().as_secs_f64(),
        };

        progress.publish(stats.documents as u64);
        tracing::info!(
            build_id = %stats.build_id,
            documents = stats.documents,
            dimensions = stats.dimensions,
            duration_secs = stats.duration_secs,
            "Knowledge base ready"
        );

        Ok(stats)
    }

    /// Answer a question from the published snapshot.
    pub async fn query(&self, query: &str) -> AppResult<Answer> {
        self.query_with_evidence(query)
            .await
            .map(|(answer, _)| answer)
    }

    /// Like [`KnowledgeEngine::query`], also returning the evidence with distances.
    ///
    /// Rejected with [`AppError::NotReady`] before any retrieval work when no
    /// snapshot is published. A system error during retrieval unpublishes the
    /// snapshot it was served from.
    pub async fn query_with_evidence(
        &self,
        query: &str,
    ) -> AppResult<(Answer, Vec<RetrievedEvidence>)> {
        let snapshot = self.snapshot().ok_or(AppError::NotReady)?;

        let text = query.trim();
        if text.is_empty() {
            return Err(AppError::InvalidQuery(
                "query is empty or whitespace".to_string(),
            ));
        }

        let deadline = self.options.query_timeout;
        let outcome = tokio::time::timeout(
            deadline,
            self.retriever
                .retrieve(text, &snapshot.index, &snapshot.documents),
        )
        .await;

        let evidence = match outcome {
            Ok(Ok(evidence)) => evidence,
            Ok(Err(e)) => {
                if e.is_system() {
                    self.unpublish(&snapshot, "query failed");
                }
                return Err(e);
            }
            Err(_) => {
                tracing::warn!("Query timed out after {:?}", deadline);
                return Err(AppError::QueryTimeout(deadline));
            }
        };

        let documents: Vec<Document> = evidence.iter().map(|e| e.document.clone()).collect();
        Ok((compose(text, &documents), evidence))
    }

    /// Unpublish `snapshot` only if it is still the published one.
    fn unpublish(&self, snapshot: &Arc<Snapshot>, reason: &str) {
        let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
        if published.as_ref().is_some_and(|s| Arc::ptr_eq(s, snapshot)) {
            *published = None;
            self.epoch.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(reason, build_id = %snapshot.build_id, "Knowledge base unpublished");
        }
    }
}
