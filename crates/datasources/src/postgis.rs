//! PostGIS datasource. Placeholder implementation, for future reference.

use async_trait::async_trait;

use features_domain::{Cursors, Feature, FeatureCollection};
use ogc_common::FeaturesResult;

use crate::{Datasource, FeaturesCriteria};

/// Networked PostGIS database. Not implemented yet; satisfies the
/// Datasource contract with empty results.
#[derive(Debug, Default)]
pub struct PostGisDatasource;

impl PostGisDatasource {
    pub fn new() -> Self {
        PostGisDatasource
    }
}

#[async_trait]
impl Datasource for PostGisDatasource {
    async fn get_feature_ids(
        &self,
        _collection: &str,
        _criteria: &FeaturesCriteria,
    ) -> FeaturesResult<(Vec<i64>, Cursors)> {
        Ok((Vec::new(), Cursors::default()))
    }

    async fn get_features_by_id(
        &self,
        _collection: &str,
        _feature_ids: &[i64],
    ) -> FeaturesResult<FeatureCollection> {
        Ok(FeatureCollection::default())
    }

    async fn get_features(
        &self,
        _collection: &str,
        _criteria: &FeaturesCriteria,
    ) -> FeaturesResult<Option<(FeatureCollection, Cursors)>> {
        Ok(None)
    }

    async fn get_feature(
        &self,
        _collection: &str,
        _feature_id: i64,
    ) -> FeaturesResult<Option<Feature>> {
        Ok(None)
    }

    async fn close(&self) {}
}
