//! On-disk document pool: the upload area the knowledge base is built from.
//!
//! Layout under the pool root:
//!
//! ```text
//! docs/     .pdf
//! images/   .png .jpg .jpeg .gif .bmp
//! audio/    .mp3 .wav .m4a .ogg
//! ```

use crate::types::{DocumentType, FileCounts};
use grounded_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Handle to a pool directory.
#[derive(Debug, Clone)]
pub struct DocumentPool {
    root: PathBuf,
}

impl DocumentPool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding files of one modality.
    pub fn folder(&self, doc_type: DocumentType) -> PathBuf {
        self.root.join(doc_type.folder())
    }

    /// Create the modality folders if missing.
    pub fn ensure_layout(&self) -> AppResult<()> {
        for doc_type in DocumentType::ALL {
            fs::create_dir_all(self.folder(doc_type))?;
        }
        Ok(())
    }

    /// Files of one modality with an accepted extension, sorted by name.
    ///
    /// A missing folder has no files.
    pub fn list_files(&self, doc_type: DocumentType) -> Vec<PathBuf> {
        let folder = self.folder(doc_type);
        if !folder.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| doc_type.accepts(name))
            })
            .map(|e| e.into_path())
            .collect();

        files.sort();
        files
    }

    /// Store an uploaded file in its modality folder and return the stored name.
    ///
    /// The extension must belong to `doc_type`. An existing file with the
    /// same name is replaced.
    pub fn save_upload(
        &self,
        file_name: &str,
        doc_type: DocumentType,
        bytes: &[u8],
    ) -> AppResult<String> {
        let name = sanitize_file_name(file_name).ok_or_else(|| {
            AppError::InvalidUpload(format!("Invalid file name: '{}'", file_name))
        })?;

        if !doc_type.accepts(&name) {
            return Err(AppError::InvalidUpload(format!(
                "Invalid file type for {}: {}. Allowed: {}",
                doc_type,
                name,
                doc_type.extensions().join(", ")
            )));
        }

        let folder = self.folder(doc_type);
        fs::create_dir_all(&folder)?;
        fs::write(folder.join(&name), bytes)?;

        tracing::info!(
            file = %name,
            doc_type = %doc_type,
            bytes = bytes.len(),
            "Saved upload"
        );

        Ok(name)
    }

    /// Count pool files per modality.
    pub fn file_counts(&self) -> FileCounts {
        let pdfs = self.list_files(DocumentType::Pdf).len();
        let images = self.list_files(DocumentType::Image).len();
        let audios = self.list_files(DocumentType::Audio).len();

        FileCounts {
            pdfs,
            images,
            audios,
            total: pdfs + images + audios,
        }
    }

    /// Delete every regular file in the modality folders and return how many
    /// were removed. Folders are kept.
    pub fn clear(&self) -> AppResult<usize> {
        let mut cleared = 0;

        for doc_type in DocumentType::ALL {
            let folder = self.folder(doc_type);
            if !folder.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&folder)
                .min_depth(1)
                .max_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                match fs::remove_file(entry.path()) {
                    Ok(()) => cleared += 1,
                    Err(e) => {
                        tracing::warn!("Failed to delete {:?}: {}", entry.path(), e);
                    }
                }
            }
        }

        tracing::info!(cleared, "Cleared document pool");
        Ok(cleared)
    }
}

/// Reduce an uploaded name to a safe single path component.
///
/// Directory parts are dropped, only `[A-Za-z0-9._-]` survive (spaces become
/// underscores) and leading dots are removed. `None` when nothing remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .trim()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd.pdf").as_deref(),
            Some("passwd.pdf")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\My Scan.PNG").as_deref(),
            Some("My_Scan.PNG")
        );
        assert_eq!(sanitize_file_name(".hidden.wav").as_deref(), Some("hidden.wav"));
        assert_eq!(sanitize_file_name("..."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn test_save_upload_and_counts() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path());

        let stored = pool
            .save_upload("a.pdf", DocumentType::Pdf, b"%PDF")
            .unwrap();
        assert_eq!(stored, "a.pdf");
        assert!(temp.path().join("docs/a.pdf").is_file());

        pool.save_upload("b.PNG", DocumentType::Image, b"png").unwrap();
        pool.save_upload("c.wav", DocumentType::Audio, b"wav").unwrap();
        pool.save_upload("d.mp3", DocumentType::Audio, b"mp3").unwrap();

        assert_eq!(
            pool.file_counts(),
            FileCounts {
                pdfs: 1,
                images: 1,
                audios: 2,
                total: 4
            }
        );
    }

    #[test]
    fn test_save_upload_rejects_wrong_extension() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path());

        let err = pool
            .save_upload("notes.txt", DocumentType::Pdf, b"hi")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidUpload(_)));

        let err = pool
            .save_upload("photo.png", DocumentType::Audio, b"hi")
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidUpload(_)));
        assert_eq!(pool.file_counts().total, 0);
    }

    #[test]
    fn test_list_files_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path());
        pool.ensure_layout().unwrap();

        let docs = pool.folder(DocumentType::Pdf);
        fs::write(docs.join("b.pdf"), "b").unwrap();
        fs::write(docs.join("a.pdf"), "a").unwrap();
        fs::write(docs.join("a.pdf.txt"), "sidecar").unwrap();
        fs::create_dir(docs.join("nested.pdf")).unwrap();

        let files = pool.list_files(DocumentType::Pdf);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_missing_folder_has_no_files() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path().join("absent"));
        assert!(pool.list_files(DocumentType::Image).is_empty());
        assert_eq!(pool.file_counts(), FileCounts::default());
    }

    #[test]
    fn test_clear_removes_files_keeps_folders() {
        let temp = TempDir::new().unwrap();
        let pool = DocumentPool::new(temp.path());

        pool.save_upload("a.pdf", DocumentType::Pdf, b"a").unwrap();
        pool.save_upload("b.png", DocumentType::Image, b"b").unwrap();
        fs::write(pool.folder(DocumentType::Pdf).join("a.pdf.txt"), "x").unwrap();

        let cleared = pool.clear().unwrap();
        assert_eq!(cleared, 3);
        assert_eq!(pool.file_counts().total, 0);
        assert!(pool.folder(DocumentType::Pdf).is_dir());
        assert_eq!(pool.clear().unwrap(), 0);
    }
}
