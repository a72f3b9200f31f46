//! Query parameter resolution for the items endpoints.
//!
//! Raw query parameters are validated and condensed into a
//! [`FeaturesCriteria`]. Navigation links are rebuilt from the same
//! parameters, so generated URLs carry the client's filters forward and
//! the cursor checksum stays stable across pages.

use std::collections::BTreeMap;

use datasources::FeaturesCriteria;
use features_domain::EncodedCursor;
use ogc_common::{BoundingBox, FeaturesError, FeaturesResult, Srid};

use crate::config::LimitConfig;
use crate::content_negotiation::OutputFormat;

pub const FORMAT_PARAM: &str = "f";
pub const LIMIT_PARAM: &str = "limit";
pub const CURSOR_PARAM: &str = "cursor";
pub const CRS_PARAM: &str = "crs";
pub const DATETIME_PARAM: &str = "datetime";
pub const BBOX_PARAM: &str = "bbox";
pub const BBOX_CRS_PARAM: &str = "bbox-crs";
pub const FILTER_PARAM: &str = "filter";
pub const FILTER_CRS_PARAM: &str = "filter-crs";

/// Parameters accepted by `/collections/{id}/items`.
pub const ITEMS_PARAMS: &[&str] = &[
    FORMAT_PARAM,
    LIMIT_PARAM,
    CURSOR_PARAM,
    CRS_PARAM,
    DATETIME_PARAM,
    BBOX_PARAM,
    BBOX_CRS_PARAM,
    FILTER_PARAM,
    FILTER_CRS_PARAM,
];

/// Parameters accepted by `/collections/{id}/items/{featureId}`.
pub const FEATURE_PARAMS: &[&str] = &[FORMAT_PARAM, CRS_PARAM];

/// Parameters with no filtering effect on the result set; everything
/// else feeds the cursor checksum.
const NON_FILTERING_PARAMS: &[&str] = &[FORMAT_PARAM, CURSOR_PARAM];

/// Query parameters of one request, grouped by name. Names are kept
/// sorted so checksums and generated URLs are deterministic.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            map.entry(key).or_default().push(value);
        }
        QueryParams(map)
    }

    /// First value of the given parameter, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Checksum over all filtering parameters. Values of a multi-valued
    /// parameter are hashed in sorted order, so equivalent requests
    /// produce equal checksums regardless of order on the wire.
    pub fn filters_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for (key, values) in &self.0 {
            if NON_FILTERING_PARAMS.contains(&key.as_str()) {
                continue;
            }
            let mut values = values.clone();
            values.sort();
            for value in &values {
                hasher.update(key.as_bytes());
                hasher.update(value.as_bytes());
            }
        }
        hasher.finalize()
    }

    /// Reject parameters outside the endpoint's declared surface.
    pub fn validate_known(&self, known: &[&str]) -> FeaturesResult<()> {
        let unknown: Vec<String> = self
            .0
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .flat_map(|(key, values)| values.iter().map(move |v| format!("{}={}", key, v)))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(FeaturesError::UnknownParameters(unknown.join("&")))
        }
    }
}

/// Resolve and validate all items query parameters into criteria.
///
/// The bbox and filter CRS are consolidated before the filter parameter
/// itself is checked, so a CRS conflict outranks the filter rejection in
/// the reported error.
pub fn resolve_items_query(
    params: &QueryParams,
    limits: &LimitConfig,
) -> FeaturesResult<FeaturesCriteria> {
    let filters_checksum = params.filters_checksum();

    let limit = parse_limit(params, limits)?;
    let output_srid = parse_srid(params, CRS_PARAM)?;
    let (bbox, bbox_srid) = parse_bbox(params)?;
    let filter_srid = parse_srid(params, FILTER_CRS_PARAM)?;
    let input_srid = consolidate_input_srids(bbox_srid, filter_srid)?;
    parse_datetime(params)?;
    let filter = parse_filter(params)?;

    let cursor =
        EncodedCursor::new(params.get(CURSOR_PARAM).unwrap_or_default()).decode(filters_checksum);

    Ok(FeaturesCriteria {
        cursor,
        filters_checksum,
        limit,
        output_srid,
        bbox,
        bbox_srid: input_srid,
        filter,
        filter_srid: input_srid,
    })
}

/// Resolve the query parameters of the single feature endpoint. Only
/// the output CRS is negotiable there.
pub fn resolve_feature_query(params: &QueryParams) -> FeaturesResult<Srid> {
    parse_srid(params, CRS_PARAM)
}

fn parse_limit(params: &QueryParams, limits: &LimitConfig) -> FeaturesResult<usize> {
    let Some(value) = params.get(LIMIT_PARAM) else {
        return Ok(limits.default_limit);
    };
    let limit: i64 = value
        .parse()
        .map_err(|_| FeaturesError::InvalidLimit("limit must be numeric".to_string()))?;
    if limit < 0 {
        return Err(FeaturesError::InvalidLimit(
            "limit can't be negative".to_string(),
        ));
    }
    // requests above the cap are clamped, not rejected
    Ok((limit as usize).min(limits.max_limit))
}

fn parse_srid(params: &QueryParams, param_name: &str) -> FeaturesResult<Srid> {
    match params.get(param_name) {
        Some(value) => Srid::parse(param_name, value),
        None => Ok(Srid::UNDEFINED),
    }
}

/// A bbox-crs without a bbox has no filtering effect and resolves to the
/// undefined SRID, but a malformed bbox-crs is still an error.
fn parse_bbox(params: &QueryParams) -> FeaturesResult<(Option<BoundingBox>, Srid)> {
    let bbox_srid = parse_srid(params, BBOX_CRS_PARAM)?;
    let Some(value) = params.get(BBOX_PARAM) else {
        return Ok((None, Srid::UNDEFINED));
    };
    let bbox = BoundingBox::from_query_string(value)?;
    Ok((Some(bbox), bbox_srid))
}

fn consolidate_input_srids(bbox_srid: Srid, filter_srid: Srid) -> FeaturesResult<Srid> {
    if !bbox_srid.is_undefined() && !filter_srid.is_undefined() && bbox_srid != filter_srid {
        return Err(FeaturesError::InvalidCrs(
            "bbox-crs and filter-crs need to be equal. \
             Can't use more than one CRS as input, but input and output CRS may differ"
                .to_string(),
        ));
    }
    Ok(if bbox_srid.is_undefined() {
        filter_srid
    } else {
        bbox_srid
    })
}

fn parse_datetime(params: &QueryParams) -> FeaturesResult<()> {
    match params.get(DATETIME_PARAM) {
        Some(value) if !value.is_empty() => Err(FeaturesError::UnsupportedParameter(
            DATETIME_PARAM.to_string(),
        )),
        _ => Ok(()),
    }
}

fn parse_filter(params: &QueryParams) -> FeaturesResult<Option<String>> {
    match params.get(FILTER_PARAM) {
        Some(value) if !value.is_empty() => Err(FeaturesError::UnsupportedParameter(
            "CQL filter".to_string(),
        )),
        _ => Ok(None),
    }
}

/// Builds the navigation links of a feature collection page.
pub struct FeatureCollectionUrls<'a> {
    pub base_url: &'a str,
    pub collection_id: &'a str,
    pub params: &'a QueryParams,
}

impl FeatureCollectionUrls<'_> {
    pub fn self_link(&self, format: OutputFormat) -> String {
        format!(
            "{}/collections/{}/items?{}={}",
            self.base_url,
            self.collection_id,
            FORMAT_PARAM,
            format.query_value()
        )
    }

    /// Prev/next link: the client's query parameters with the format and
    /// cursor overwritten, everything else carried forward verbatim.
    pub fn nav_link(&self, cursor: &EncodedCursor, format: OutputFormat) -> String {
        let mut params = self.params.0.clone();
        params.insert(
            FORMAT_PARAM.to_string(),
            vec![format.query_value().to_string()],
        );
        params.insert(CURSOR_PARAM.to_string(), vec![cursor.as_str().to_string()]);

        let query = params
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| format!("{}={}", key, v)))
            .collect::<Vec<_>>()
            .join("&");
        format!(
            "{}/collections/{}/items?{}",
            self.base_url, self.collection_id, query
        )
    }
}

pub fn feature_self_link(
    base_url: &str,
    collection_id: &str,
    feature_id: i64,
    format: OutputFormat,
) -> String {
    format!(
        "{}/collections/{}/items/{}?{}={}",
        base_url,
        collection_id,
        feature_id,
        FORMAT_PARAM,
        format.query_value()
    )
}

pub fn collection_link(base_url: &str, collection_id: &str) -> String {
    format!("{}/collections/{}", base_url, collection_id)
}
