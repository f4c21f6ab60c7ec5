//! Ask command handler.
//!
//! One-shot question answering: build from the pool, then query.

use clap::Args;
use grounded_core::{config::AppConfig, AppResult};

/// Build from the pool, then answer a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Question to answer
    pub query: String,

    /// Number of neighbors to retrieve (overrides config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Largest squared L2 distance accepted as evidence (overrides config)
    #[arg(long)]
    pub max_distance: Option<f32>,

    /// Output as JSON, including the evidence list
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(max_distance) = self.max_distance {
            config.retrieval.max_distance = max_distance;
        }
        config.validate()?;

        let (engine, stats) = super::build::build_from_pool(&config, self.json).await?;
        tracing::debug!(documents = stats.documents, "Knowledge base ready");

        let (answer, evidence) = engine.query_with_evidence(&self.query).await?;

        if self.json {
            let evidence: Vec<_> = evidence
                .iter()
                .map(|item| {
                    serde_json::json!({
                        "source": item.document.source,
                        "type": item.document.doc_type.as_str(),
                        "distance": item.distance,
                    })
                })
                .collect();
            let output = serde_json::json!({
                "query": self.query,
                "answer": answer,
                "evidence": evidence,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.text);
        }

        Ok(())
    }
}
