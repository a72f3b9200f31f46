//! Storage backends for feature collections.
//!
//! A [`Datasource`] holds all features for a set of collections in a
//! specific projection. Backends are selected from configuration at
//! startup and accessed through the trait object for the lifetime of the
//! process; they must tolerate concurrent calls from simultaneous
//! requests.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use features_domain::{CursorPosition, Cursors, Feature, FeatureCollection};
use ogc_common::{BoundingBox, FeaturesError, FeaturesResult, Srid};

pub mod geopackage;
pub mod postgis;

pub use geopackage::GeoPackageDatasource;
pub use postgis::PostGisDatasource;

/// The resolved, validated query intent for one request. Constructed
/// once per request by the query resolver and consumed read-only.
#[derive(Debug, Clone, Default)]
pub struct FeaturesCriteria {
    // pagination
    pub cursor: CursorPosition,
    pub filters_checksum: u32,
    pub limit: usize,

    // multiple projections support
    pub output_srid: Srid,

    // filtering by bounding box
    pub bbox: Option<BoundingBox>,
    pub bbox_srid: Srid,

    // filtering by CQL (reserved, currently rejected upstream)
    pub filter: Option<String>,
    pub filter_srid: Srid,
}

/// Contract implemented by every storage backend.
///
/// Error policy: backend failures are returned, never logged with
/// request details by the backend itself; logging happens at the HTTP
/// boundary. A missing feature or collection is a `None`/empty result,
/// not an error, so the orchestration layer can map it to "not found".
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Returns all feature ids matching the given criteria plus cursors
    /// for pagination. To be used in concert with `get_features_by_id`.
    async fn get_feature_ids(
        &self,
        collection: &str,
        criteria: &FeaturesCriteria,
    ) -> FeaturesResult<(Vec<i64>, Cursors)>;

    /// Returns the features with the given ids. Result order is not
    /// guaranteed; callers restore ordering when they need it.
    async fn get_features_by_id(
        &self,
        collection: &str,
        feature_ids: &[i64],
    ) -> FeaturesResult<FeatureCollection>;

    /// Returns one page of features matching the given criteria plus
    /// cursors for pagination. Features are sorted ascending by id
    /// regardless of navigation direction. `None` means the collection
    /// does not exist in this datasource.
    async fn get_features(
        &self,
        collection: &str,
        criteria: &FeaturesCriteria,
    ) -> FeaturesResult<Option<(FeatureCollection, Cursors)>>;

    /// Returns a specific feature, or `None` when it does not exist.
    async fn get_feature(
        &self,
        collection: &str,
        feature_id: i64,
    ) -> FeaturesResult<Option<Feature>>;

    /// Releases backend resources. Idempotent; called during shutdown.
    async fn close(&self);
}

/// Mapping of a collection to its backing table.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionTable {
    /// Collection identifier.
    pub id: String,

    /// Table name; defaults to the collection id.
    #[serde(default)]
    pub table: Option<String>,

    /// Identity column, the pagination sort key.
    #[serde(default = "default_fid_column")]
    pub fid_column: String,

    /// Geometry column holding the backend's native encoding.
    #[serde(default = "default_geom_column")]
    pub geom_column: String,
}

impl CollectionTable {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            table: None,
            fid_column: default_fid_column(),
            geom_column: default_geom_column(),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.id)
    }
}

fn default_fid_column() -> String {
    "fid".to_string()
}

fn default_geom_column() -> String {
    "geom".to_string()
}

/// Backend connection settings; exactly one variant must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default)]
    pub geopackage: Option<GeoPackageConfig>,

    #[serde(default)]
    pub postgis: Option<PostGisConfig>,
}

/// A GeoPackage on local disk.
#[derive(Debug, Clone, Deserialize)]
pub struct GeoPackageConfig {
    pub file: PathBuf,
}

/// A networked PostGIS database.
#[derive(Debug, Clone, Deserialize)]
pub struct PostGisConfig {
    pub url: String,
}

/// Construct the configured backend.
pub async fn create_datasource(
    config: &DatasourceConfig,
    collections: Vec<CollectionTable>,
) -> FeaturesResult<Box<dyn Datasource>> {
    if let Some(gpkg) = &config.geopackage {
        let datasource = GeoPackageDatasource::connect(&gpkg.file, collections).await?;
        return Ok(Box::new(datasource));
    }
    if config.postgis.is_some() {
        return Ok(Box::new(PostGisDatasource::new()));
    }
    Err(FeaturesError::InternalError(
        "no datasource configured, expected either a geopackage or postgis section".to_string(),
    ))
}
