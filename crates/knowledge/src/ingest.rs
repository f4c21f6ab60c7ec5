//! Turn pool files into [`Document`] records.
//!
//! Text extraction itself (PDF parsing, OCR, transcription) happens outside
//! this crate. A [`ContentExtractor`] is the seam: the shipped
//! [`SidecarExtractor`] reads the text an extraction tool left next to each
//! file.

use crate::pool::DocumentPool;
use crate::progress::ProgressReporter;
use crate::types::{Document, DocumentType, Segment};
use grounded_core::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Extracted text of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub segments: Option<Vec<Segment>>,
}

impl Extraction {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            segments: None,
        }
    }
}

/// Turns a file of one modality into text.
pub trait ContentExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, path: &Path) -> AppResult<Extraction>;
}

/// Creates an extractor on first use.
pub type ExtractorFactory = Arc<dyn Fn() -> AppResult<Arc<dyn ContentExtractor>> + Send + Sync>;

/// Audio transcript as written by the transcription tool.
#[derive(Debug, Deserialize)]
struct Transcript {
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

/// Reads `<file>.txt`, or for audio `<file>.json`, beside each pool file.
///
/// Falls back to the file's own bytes when they are valid UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarExtractor;

impl SidecarExtractor {
    fn sidecar(path: &Path, extension: &str) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }

    fn read_transcript(path: &Path) -> AppResult<Extraction> {
        let raw = fs::read_to_string(path)?;
        let transcript: Transcript = serde_json::from_str(&raw)?;
        let segments = if transcript.segments.is_empty() {
            None
        } else {
            Some(transcript.segments)
        };

        Ok(Extraction {
            text: transcript.text,
            segments,
        })
    }
}

impl ContentExtractor for SidecarExtractor {
    fn name(&self) -> &str {
        "sidecar"
    }

    fn extract(&self, path: &Path) -> AppResult<Extraction> {
        let json = Self::sidecar(path, "json");
        if DocumentType::from_path(path) == Some(DocumentType::Audio) && json.is_file() {
            return Self::read_transcript(&json);
        }

        let txt = Self::sidecar(path, "txt");
        if txt.is_file() {
            return Ok(Extraction::text(fs::read_to_string(&txt)?));
        }

        let bytes = fs::read(path)?;
        String::from_utf8(bytes).map(Extraction::text).map_err(|_| {
            AppError::Knowledge(format!(
                "No extracted text for {:?} (expected {:?})",
                path, txt
            ))
        })
    }
}

/// Walks a [`DocumentPool`] and extracts one document per file.
pub struct Ingestor {
    extractors: HashMap<DocumentType, Arc<dyn ContentExtractor>>,
    audio_factory: ExtractorFactory,
    audio: OnceCell<Arc<dyn ContentExtractor>>,
}

impl fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .extractors
            .iter()
            .map(|(t, e)| format!("{}={}", t, e.name()))
            .collect();
        names.sort();

        f.debug_struct("Ingestor")
            .field("extractors", &names)
            .field("audio_loaded", &self.audio_loaded())
            .finish()
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Ingestor {
    /// Sidecar extraction for every modality.
    pub fn new() -> Self {
        let sidecar: Arc<dyn ContentExtractor> = Arc::new(SidecarExtractor);
        let mut extractors = HashMap::new();
        extractors.insert(DocumentType::Pdf, sidecar.clone());
        extractors.insert(DocumentType::Image, sidecar);

        Self {
            extractors,
            audio_factory: Arc::new(|| -> AppResult<Arc<dyn ContentExtractor>> {
                Ok(Arc::new(SidecarExtractor))
            }),
            audio: OnceCell::new(),
        }
    }

    /// Set how the audio extractor is created. It runs when the first audio
    /// file is ingested and is retried on the next ingest only if it failed.
    pub fn with_audio_factory(mut self, factory: ExtractorFactory) -> Self {
        self.audio_factory = factory;
        self
    }

    /// Whether the audio extractor has been created.
    pub fn audio_loaded(&self) -> bool {
        self.audio.initialized()
    }

    async fn extractor(&self, doc_type: DocumentType) -> AppResult<Arc<dyn ContentExtractor>> {
        if doc_type != DocumentType::Audio {
            return self.extractors.get(&doc_type).cloned().ok_or_else(|| {
                AppError::Knowledge(format!("No extractor registered for {}", doc_type))
            });
        }

        let extractor = self
            .audio
            .get_or_try_init(|| async {
                let extractor = (self.audio_factory)()?;
                tracing::info!("Loaded audio extractor '{}'", extractor.name());
                Ok::<_, AppError>(extractor)
            })
            .await?;

        Ok(extractor.clone())
    }

    /// Ingest every accepted file in the pool, PDFs first, then images, then audio.
    ///
    /// Files that fail extraction or yield no text are skipped. An empty
    /// pool yields an empty list.
    pub async fn ingest(
        &self,
        pool: &DocumentPool,
        progress: &ProgressReporter,
    ) -> AppResult<Vec<Document>> {
        pool.ensure_layout()?;

        let files: Vec<(DocumentType, PathBuf)> = DocumentType::ALL
            .into_iter()
            .flat_map(|t| pool.list_files(t).into_iter().map(move |p| (t, p)))
            .collect();
        let total = files.len() as u64;

        let mut documents = Vec::new();
        let mut skipped = 0usize;
        // A failed audio model load skips the remaining audio for this run only.
        let mut audio_unavailable = false;

        for (i, (doc_type, path)) in files.iter().enumerate() {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress.ingest(i as u64 + 1, Some(total), &source);

            if *doc_type == DocumentType::Audio && audio_unavailable {
                skipped += 1;
                continue;
            }

            let extractor = match self.extractor(*doc_type).await {
                Ok(extractor) => extractor,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: no {} extractor: {}", path, doc_type, e);
                    audio_unavailable |= *doc_type == DocumentType::Audio;
                    skipped += 1;
                    continue;
                }
            };
            let extraction = match extractor.extract(path) {
                Ok(extraction) => extraction,
                Err(e) => {
                    tracing::warn!("Skipping {:?}: {}", path, e);
                    skipped += 1;
                    continue;
                }
            };

            if extraction.text.trim().is_empty() {
                tracing::warn!("Skipping {:?}: no text extracted", path);
                skipped += 1;
                continue;
            }

            tracing::debug!(
                source = %source,
                doc_type = %doc_type,
                chars = extraction.text.chars().count(),
                "Ingested document"
            );

            let mut document = Document::new(extraction.text, source, *doc_type);
            if let Some(segments) = extraction.segments {
                document = document.with_segments(segments);
            }
            documents.push(document);
        }

        tracing::info!(
            documents = documents.len(),
            skipped,
            pool = ?pool.root(),
            "Ingestion finished"
        );

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn pool_with_layout() -> (TempDir, DocumentPool) {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path());
        pool.ensure_layout().unwrap();
        (temp, pool)
    }

    struct CountingFactory(Arc<AtomicUsize>);

    impl CountingFactory {
        fn factory(&self) -> ExtractorFactory {
            let calls = self.0.clone();
            Arc::new(move || -> AppResult<Arc<dyn ContentExtractor>> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(SidecarExtractor))
            })
        }
    }

    #[test]
    fn test_sidecar_txt_preferred() {
        let (_temp, pool) = pool_with_layout();
        let pdf = pool.folder(DocumentType::Pdf).join("a.pdf");
        fs::write(&pdf, [0xff, 0xfe, 0x00]).unwrap();
        fs::write(pool.folder(DocumentType::Pdf).join("a.pdf.txt"), "The sky is blue").unwrap();

        let extraction = SidecarExtractor.extract(&pdf).unwrap();
        assert_eq!(extraction.text, "The sky is blue");
        assert!(extraction.segments.is_none());
    }

    #[test]
    fn test_sidecar_transcript_with_segments() {
        let (_temp, pool) = pool_with_layout();
        let wav = pool.folder(DocumentType::Audio).join("memo.wav");
        fs::write(&wav, [0u8, 1, 2]).unwrap();
        fs::write(
            pool.folder(DocumentType::Audio).join("memo.wav.json"),
            r#"{"text": "hello there", "segments": [{"start": 0.0, "end": 1.2, "text": "hello there"}]}"#,
        )
        .unwrap();

        let extraction = SidecarExtractor.extract(&wav).unwrap();
        assert_eq!(extraction.text, "hello there");
        assert_eq!(extraction.segments.unwrap().len(), 1);
    }

    #[test]
    fn test_binary_without_sidecar_fails() {
        let (_temp, pool) = pool_with_layout();
        let png = pool.folder(DocumentType::Image).join("b.png");
        fs::write(&png, [0x89, 0x50, 0xff, 0xfe]).unwrap();

        assert!(SidecarExtractor.extract(&png).is_err());
    }

    #[tokio::test]
    async fn test_ingest_orders_by_modality_then_name() {
        let (_temp, pool) = pool_with_layout();
        fs::write(pool.folder(DocumentType::Image).join("b.png.txt"), "Sky: blue").unwrap();
        fs::write(pool.folder(DocumentType::Image).join("b.png"), [0xffu8]).unwrap();
        fs::write(pool.folder(DocumentType::Pdf).join("z.pdf"), "Zebra facts").unwrap();
        fs::write(pool.folder(DocumentType::Pdf).join("a.pdf"), "The sky is blue").unwrap();

        let documents = Ingestor::new()
            .ingest(&pool, &ProgressReporter::noop())
            .await
            .unwrap();

        let sources: Vec<_> = documents.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a.pdf", "z.pdf", "b.png"]);
        assert_eq!(documents[2].doc_type, DocumentType::Image);
        assert_eq!(documents[2].content, "Sky: blue");
    }

    #[tokio::test]
    async fn test_ingest_skips_empty_and_unreadable() {
        let (_temp, pool) = pool_with_layout();
        fs::write(pool.folder(DocumentType::Pdf).join("blank.pdf"), "   \n").unwrap();
        fs::write(pool.folder(DocumentType::Image).join("raw.jpg"), [0xffu8, 0xd8]).unwrap();

        let documents = Ingestor::new()
            .ingest(&pool, &ProgressReporter::noop())
            .await
            .unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path().join("fresh"));

        let documents = Ingestor::new()
            .ingest(&pool, &ProgressReporter::noop())
            .await
            .unwrap();
        assert!(documents.is_empty());
        assert!(pool.folder(DocumentType::Audio).is_dir());
    }

    #[tokio::test]
    async fn test_audio_extractor_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = CountingFactory(calls.clone());
        let ingestor = Ingestor::new().with_audio_factory(counting.factory());

        let (_temp, pool) = pool_with_layout();
        fs::write(pool.folder(DocumentType::Pdf).join("a.pdf"), "text").unwrap();

        ingestor.ingest(&pool, &ProgressReporter::noop()).await.unwrap();
        assert!(!ingestor.audio_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        fs::write(pool.folder(DocumentType::Audio).join("one.wav"), "first clip").unwrap();
        fs::write(pool.folder(DocumentType::Audio).join("two.wav"), "second clip").unwrap();

        let documents = ingestor.ingest(&pool, &ProgressReporter::noop()).await.unwrap();
        assert_eq!(documents.len(), 3);
        assert!(ingestor.audio_loaded());

        ingestor.ingest(&pool, &ProgressReporter::noop()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_audio_factory_failure_skips_audio_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let ingestor = Ingestor::new().with_audio_factory(Arc::new(
            move || -> AppResult<Arc<dyn ContentExtractor>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Knowledge("model download failed".to_string()))
            },
        ));

        let (_temp, pool) = pool_with_layout();
        fs::write(pool.folder(DocumentType::Pdf).join("a.pdf"), "The sky is blue").unwrap();
        fs::write(pool.folder(DocumentType::Audio).join("a.mp3"), "clip").unwrap();
        fs::write(pool.folder(DocumentType::Audio).join("b.wav"), "clip").unwrap();

        let documents = ingestor
            .ingest(&pool, &ProgressReporter::noop())
            .await
            .unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source, "a.pdf");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!ingestor.audio_loaded());
    }
}
