//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Modality a document was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Image,
    Audio,
}

impl DocumentType {
    /// All modalities, in ingestion order.
    pub const ALL: [DocumentType; 3] = [DocumentType::Pdf, DocumentType::Image, DocumentType::Audio];

    /// Lowercase name used on the wire and in config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Parse a modality name as sent by upload forms.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    /// Pool sub-folder holding files of this modality.
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Pdf => "docs",
            Self::Image => "images",
            Self::Audio => "audio",
        }
    }

    /// Accepted file extensions, lowercase with leading dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &[".pdf"],
            Self::Image => &[".png", ".jpg", ".jpeg", ".gif", ".bmp"],
            Self::Audio => &[".mp3", ".wav", ".m4a", ".ogg"],
        }
    }

    /// Whether a file name carries one of this modality's extensions.
    pub fn accepts(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.extensions().iter().any(|ext| lower.ends_with(ext))
    }

    /// Detect the modality from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|t| t.accepts(name))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A timed transcript span. Captured for audio, not used by retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A unit of ingested content. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text
    pub content: String,

    /// Source identifier, normally the file name
    pub source: String,

    /// Modality the text came from
    #[serde(rename = "type")]
    pub doc_type: DocumentType,

    /// Transcript segments (audio only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
}

impl Document {
    /// Create a document without segments.
    pub fn new(content: impl Into<String>, source: impl Into<String>, doc_type: DocumentType) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            doc_type,
            segments: None,
        }
    }

    /// Attach transcript segments.
    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = Some(segments);
        self
    }
}

/// Whether queries may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    NotReady,
    Ready,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Statistics from a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Identifier of the published snapshot
    pub build_id: Uuid,

    /// Number of indexed documents
    pub documents: usize,

    /// Embedding dimensions
    pub dimensions: usize,

    /// When the snapshot was published
    pub built_at: DateTime<Utc>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Counts of pool files with accepted extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounts {
    pub pdfs: usize,
    pub images: usize,
    pub audios: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_from_path() {
        assert_eq!(
            DocumentType::from_path(Path::new("data/docs/Report.PDF")),
            Some(DocumentType::Pdf)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("scan.jpeg")),
            Some(DocumentType::Image)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("memo.m4a")),
            Some(DocumentType::Audio)
        );
        assert_eq!(DocumentType::from_path(Path::new("notes.docx")), None);
    }

    #[test]
    fn test_document_serializes_type_field() {
        let doc = Document::new("The sky is blue", "a.pdf", DocumentType::Pdf);
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["type"], "pdf");
        assert_eq!(json["source"], "a.pdf");
        assert!(json.get("segments").is_none());
    }

    #[test]
    fn test_document_deserializes_segments() {
        let json = r#"{
            "content": "hello there",
            "source": "clip.wav",
            "type": "audio",
            "segments": [{"start": 0.0, "end": 1.5, "text": "hello there"}]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();

        assert_eq!(doc.doc_type, DocumentType::Audio);
        assert_eq!(doc.segments.unwrap()[0].end, 1.5);
    }

    #[test]
    fn test_parse_document_type() {
        assert_eq!(DocumentType::parse(" Image "), Some(DocumentType::Image));
        assert_eq!(DocumentType::parse("video"), None);
    }
}
