//! Status command handler.
//!
//! Reports pool contents and the effective configuration. Builds live only
//! in memory, so there is no index to report outside a running server.

use clap::Args;
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::KnowledgeSettings;

/// Show document pool and configuration status
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let settings = KnowledgeSettings::from_app_config(config);
        let counts = settings.pool().file_counts();

        if self.json {
            let output = serde_json::json!({
                "dataDir": settings.data_dir,
                "fileCounts": counts,
                "embedding": {
                    "provider": config.embedding.provider,
                    "model": config.embedding.model,
                    "dimensions": config.embedding.dimensions,
                },
                "retrieval": {
                    "topK": config.retrieval.top_k,
                    "maxDistance": config.retrieval.max_distance,
                },
                "server": format!("{}:{}", config.server.host, config.server.port),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Data dir:   {}", settings.data_dir.display());
            println!(
                "Files:      {} total ({} pdfs, {} images, {} audios)",
                counts.total, counts.pdfs, counts.images, counts.audios
            );
            println!(
                "Embedding:  {} / {} ({} dimensions)",
                config.embedding.provider, config.embedding.model, config.embedding.dimensions
            );
            println!(
                "Retrieval:  top_k={} max_distance={}",
                config.retrieval.top_k, config.retrieval.max_distance
            );
            println!("Server:     {}:{}", config.server.host, config.server.port);
        }

        Ok(())
    }
}
