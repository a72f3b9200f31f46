//! YAML configuration for the feature server.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use datasources::{CollectionTable, DatasourceConfig};

/// Top-level server configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// External base URL used when building navigation links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub limits: LimitConfig,

    pub datasource: DatasourceConfig,

    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.collections.is_empty() {
            bail!("config must declare at least one collection");
        }
        if self.limits.default_limit > self.limits.max_limit {
            bail!(
                "default limit {} exceeds max limit {}",
                self.limits.default_limit,
                self.limits.max_limit
            );
        }
        Ok(())
    }

    /// Table mappings for the datasource, one per collection.
    pub fn collection_tables(&self) -> Vec<CollectionTable> {
        self.collections.iter().map(CollectionConfig::table_mapping).collect()
    }

    /// Descriptive metadata, keyed by collection id.
    pub fn collection_metadata(&self) -> HashMap<String, CollectionMetadata> {
        self.collections
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    CollectionMetadata {
                        title: c.title.clone(),
                        description: c.description.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Page size limits for the items endpoint.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitConfig {
    /// Page size when the client does not ask for one.
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Hard upper bound; larger requests are clamped, not rejected.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// One published feature collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub id: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Backing table name; defaults to the collection id.
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub fid_column: Option<String>,

    #[serde(default)]
    pub geom_column: Option<String>,
}

impl CollectionConfig {
    pub fn table_mapping(&self) -> CollectionTable {
        let mut table = CollectionTable::new(&self.id);
        table.table = self.table.clone();
        if let Some(fid_column) = &self.fid_column {
            table.fid_column = fid_column.clone();
        }
        if let Some(geom_column) = &self.geom_column {
            table.geom_column = geom_column.clone();
        }
        table
    }
}

/// Descriptive collection metadata, immutable after startup.
#[derive(Debug, Clone)]
pub struct CollectionMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    1000
}
