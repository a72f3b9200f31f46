//! Handlers for the feature items endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;

use features_domain::{ExceptionResponse, Link};
use ogc_common::FeaturesError;

use crate::content_negotiation::{negotiate_format, OutputFormat};
use crate::query::{self, FeatureCollectionUrls, QueryParams};
use crate::state::AppState;

use super::{client_error_response, error_response};

/// GET /collections/:collection_id/items - One page of features
pub async fn get_features_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    Query(raw_params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let params = QueryParams::from_pairs(raw_params);

    if !state.collections.contains_key(&collection_id) {
        return collection_not_found(&collection_id);
    }

    let format = match negotiate_format(&headers, params.get(query::FORMAT_PARAM)) {
        Ok(format) => format,
        Err(e) => return client_error_response(&e),
    };

    if let Err(e) = params.validate_known(query::ITEMS_PARAMS) {
        return client_error_response(&e);
    }

    let criteria = match query::resolve_items_query(&params, &state.limits) {
        Ok(criteria) => criteria,
        Err(e) => return client_error_response(&e),
    };

    let result = match state.datasource.get_features(&collection_id, &criteria).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(
                "failed to retrieve features in collection {}: {}",
                collection_id,
                e
            );
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ExceptionResponse::internal_error(format!(
                    "failed to retrieve feature collection {}",
                    collection_id
                )),
            );
        }
    };

    // the datasource is authoritative on which collections exist
    let Some((mut collection, cursors)) = result else {
        return collection_not_found(&collection_id);
    };

    let urls = FeatureCollectionUrls {
        base_url: &state.base_url,
        collection_id: &collection_id,
        params: &params,
    };
    collection
        .links
        .push(Link::new("self", urls.self_link(format)).with_type(format.content_type()));
    if let Some(prev) = &cursors.prev {
        collection
            .links
            .push(Link::new("prev", urls.nav_link(prev, format)).with_type(format.content_type()));
    }
    if let Some(next) = &cursors.next {
        collection
            .links
            .push(Link::new("next", urls.nav_link(next, format)).with_type(format.content_type()));
    }

    render(&collection, format)
}

/// GET /collections/:collection_id/items/:feature_id - A single feature
pub async fn get_feature_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, feature_id)): Path<(String, String)>,
    Query(raw_params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let params = QueryParams::from_pairs(raw_params);

    if !state.collections.contains_key(&collection_id) {
        return collection_not_found(&collection_id);
    }

    let format = match negotiate_format(&headers, params.get(query::FORMAT_PARAM)) {
        Ok(format) => format,
        Err(e) => return client_error_response(&e),
    };

    if let Err(e) = params.validate_known(query::FEATURE_PARAMS) {
        return client_error_response(&e);
    }

    let feature_id: i64 = match feature_id.parse() {
        Ok(id) => id,
        Err(_) => return client_error_response(&FeaturesError::NonNumericFeatureId),
    };

    // output CRS is validated even though reprojection is not performed
    if let Err(e) = query::resolve_feature_query(&params) {
        return client_error_response(&e);
    }

    let mut feature = match state.datasource.get_feature(&collection_id, feature_id).await {
        Ok(Some(feature)) => feature,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                ExceptionResponse::not_found(format!(
                    "Feature {} not found in collection {}",
                    feature_id, collection_id
                )),
            );
        }
        Err(e) => {
            tracing::error!(
                "failed to retrieve feature {} in collection {}: {}",
                feature_id,
                collection_id,
                e
            );
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ExceptionResponse::internal_error(format!(
                    "failed to retrieve feature {} in collection {}",
                    feature_id, collection_id
                )),
            );
        }
    };

    feature.links.push(
        Link::new(
            "self",
            query::feature_self_link(&state.base_url, &collection_id, feature_id, format),
        )
        .with_type(format.content_type()),
    );
    feature.links.push(
        Link::new(
            "collection",
            query::collection_link(&state.base_url, &collection_id),
        )
        .with_type("application/json"),
    );

    render(&feature, format)
}

fn collection_not_found(collection_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        ExceptionResponse::not_found(format!("Collection not found: {}", collection_id)),
    )
}

fn render<T: Serialize>(body: &T, format: OutputFormat) -> Response {
    match serde_json::to_string(body) {
        Ok(json) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, format.content_type())
            .body(json.into())
            .unwrap(),
        Err(e) => {
            tracing::error!("failed to serialize response: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ExceptionResponse::internal_error("Failed to serialize response"),
            )
        }
    }
}
