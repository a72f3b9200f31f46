//! Shared application state.

use std::collections::HashMap;

use anyhow::Result;

use datasources::{create_datasource, Datasource};

use crate::config::{CollectionMetadata, LimitConfig, ServerConfig};

/// State wired into every handler. Collections are immutable after
/// startup; the datasource handles its own concurrency.
pub struct AppState {
    pub datasource: Box<dyn Datasource>,
    pub collections: HashMap<String, CollectionMetadata>,
    pub limits: LimitConfig,
    pub base_url: String,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let datasource = create_datasource(&config.datasource, config.collection_tables()).await?;
        let collections = config.collection_metadata();
        tracing::info!("serving {} feature collection(s)", collections.len());

        Ok(Self {
            datasource,
            collections,
            limits: config.limits,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}
