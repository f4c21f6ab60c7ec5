//! Files command handler.
//!
//! Adds files to the document pool or clears it, mirroring the upload and
//! clear-files endpoints.

use clap::{Args, Subcommand};
use grounded_core::{config::AppConfig, AppError, AppResult};
use grounded_knowledge::{DocumentType, KnowledgeSettings};
use std::path::PathBuf;

/// Manage files in the document pool
#[derive(Args, Debug)]
pub struct FilesCommand {
    #[command(subcommand)]
    pub action: FilesAction,
}

#[derive(Subcommand, Debug)]
pub enum FilesAction {
    /// Copy files into the pool
    Add(FilesAddCommand),
    /// Delete every file in the pool
    Clear(FilesClearCommand),
}

impl FilesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            FilesAction::Add(cmd) => cmd.execute(config).await,
            FilesAction::Clear(cmd) => cmd.execute(config).await,
        }
    }
}

/// Copy files into the pool
#[derive(Args, Debug)]
pub struct FilesAddCommand {
    /// Modality: pdf, image or audio
    #[arg(short = 't', long = "type")]
    pub doc_type: String,

    /// Files to add
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl FilesAddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing files add command");

        let doc_type = DocumentType::parse(&self.doc_type).ok_or_else(|| {
            AppError::InvalidUpload(format!("Unknown document type '{}'", self.doc_type))
        })?;

        let pool = KnowledgeSettings::from_app_config(config).pool();
        pool.ensure_layout()?;

        for path in &self.paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| AppError::InvalidUpload(format!("Invalid file name {:?}", path)))?;
            let bytes = tokio::fs::read(path).await?;
            let saved = pool.save_upload(name, doc_type, &bytes)?;
            println!("Added {} to {}/", saved, doc_type.folder());
        }

        Ok(())
    }
}

/// Delete every file in the pool
#[derive(Args, Debug)]
pub struct FilesClearCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl FilesClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing files clear command");

        let pool = KnowledgeSettings::from_app_config(config).pool();

        if !self.yes {
            let counts = pool.file_counts();
            println!(
                "This will delete {} files under {}. Re-run with --yes to confirm.",
                counts.total,
                pool.root().display()
            );
            return Ok(());
        }

        let removed = pool.clear()?;
        println!("Removed {} files", removed);

        Ok(())
    }
}
