//! Serve command handler.
//!
//! Runs the HTTP API until Ctrl-C.

use clap::Args;
use grounded_core::{config::AppConfig, AppError, AppResult};

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Interface to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let mut config = config.clone();
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        grounded_server::start(&config)
            .await
            .map_err(|e| AppError::Other(format!("Server error: {:#}", e)))
    }
}
