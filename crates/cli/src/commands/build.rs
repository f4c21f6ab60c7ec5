//! Build command handler.
//!
//! Ingests the document pool and publishes a fresh index, the same work
//! `POST /api/build` does for the server.

use clap::Args;
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::{BuildStats, Ingestor, KnowledgeEngine, KnowledgeSettings};

/// Build the knowledge base from the document pool
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command");

        let (_, stats) = build_from_pool(config, self.quiet).await?;

        if self.json {
            let output = serde_json::json!({
                "buildId": stats.build_id,
                "documents": stats.documents,
                "dimensions": stats.dimensions,
                "builtAt": stats.built_at,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Built knowledge base: {} documents ({} dimensions) in {:.2}s",
                stats.documents, stats.dimensions, stats.duration_secs
            );
        }

        Ok(())
    }
}

/// Load the embedder and build from the configured pool.
pub(crate) async fn build_from_pool(
    config: &AppConfig,
    quiet: bool,
) -> AppResult<(KnowledgeEngine, BuildStats)> {
    let settings = KnowledgeSettings::from_app_config(config);
    let pool = settings.pool();
    pool.ensure_layout()?;

    let engine = KnowledgeEngine::from_settings(&settings).await?;
    let stats = engine
        .rebuild_from(&Ingestor::new(), &pool, &super::stderr_progress(quiet))
        .await?;

    Ok((engine, stats))
}
