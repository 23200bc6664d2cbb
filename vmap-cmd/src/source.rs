//! Choosing and opening the dataset a command runs against.

use anyhow::Context;
use clap::Args;
use log::info;
use std::sync::Arc;
use vmap_core::service::{FeatureServiceClient, ServiceConfig, DEFAULT_SERVICE_URL};
use vmap_core::traits::FeatureSource;
use vmap_db::Database;

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Observations CSV to query locally instead of the feature service
    #[arg(short = 'o', long, conflicts_with = "service_url")]
    pub observations: Option<String>,

    /// Feature service layer URL
    #[arg(short = 's', long)]
    pub service_url: Option<String>,
}

impl SourceArgs {
    pub async fn open(&self) -> anyhow::Result<Arc<dyn FeatureSource>> {
        match &self.observations {
            Some(path) => {
                let csv = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading observations from {}", path))?;
                let db = Database::new()?;
                let loaded = db.load_features(&csv)?;
                info!("[VMAP] source: {} observations from {}", loaded, path);
                if let Some((first, last)) = db.query_date_range()? {
                    info!("[VMAP] source: weeks ending {} to {}", first, last);
                }
                Ok(Arc::new(db))
            }
            None => {
                let config = ServiceConfig {
                    url: self
                        .service_url
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string()),
                    ..ServiceConfig::default()
                };
                let client = FeatureServiceClient::new(config)?;
                info!(
                    "[VMAP] source: feature service at {} (timeout {:?})",
                    client.config().url,
                    client.config().timeout
                );
                Ok(Arc::new(client))
            }
        }
    }
}
