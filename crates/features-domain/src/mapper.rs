//! Datasource-agnostic mapping from tabular result rows to Features.
//!
//! Backends convert their native result sets into [`TableRow`]s and
//! supply the geometry decoder for their native encoding; everything
//! else (identity column handling, property typing, ordering) is shared
//! across backends.

use chrono::{DateTime, Utc};
use ogc_common::FeaturesError;

use crate::feature::{Feature, Geometry, PropertyValue};

/// Columns that only exist to support backend-side bounding box and zoom
/// filtering; they never surface as feature properties.
const FILTERING_HELPER_COLUMNS: [&str; 6] =
    ["minx", "miny", "maxx", "maxy", "min_zoom", "max_zoom"];

/// A single result row: column names paired with runtime-typed values.
#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub columns: Vec<(String, ColumnValue)>,
}

impl TableRow {
    pub fn new(columns: Vec<(String, ColumnValue)>) -> Self {
        Self { columns }
    }
}

/// Runtime-typed column value. Backends fail closed when a column holds a
/// type not representable here, rather than silently dropping data.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bytes(Vec<u8>),
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// Map a result set to Features. `fid_column` must hold a 64-bit integer
/// identity and `geom_column` the backend's binary geometry encoding,
/// decoded through `geom_decoder`.
///
/// Any mapping error aborts the remaining rows: column positions are
/// shared across rows, so a malformed schema voids the rest of the page,
/// and a partial page would corrupt pagination guarantees.
///
/// The returned features are sorted ascending by id regardless of row
/// order; 'previous' navigation queries in descending order and relies on
/// this re-ascent.
pub fn map_rows_to_features<I, F>(
    rows: I,
    fid_column: &str,
    geom_column: &str,
    geom_decoder: F,
) -> Result<Vec<Feature>, FeaturesError>
where
    I: IntoIterator<Item = TableRow>,
    F: Fn(&[u8]) -> Result<geo_types::Geometry<f64>, FeaturesError>,
{
    let mut result = Vec::new();
    for row in rows {
        result.push(map_row_to_feature(row, fid_column, geom_column, &geom_decoder)?);
    }
    result.sort_by_key(|feature| feature.id);
    Ok(result)
}

fn map_row_to_feature<F>(
    row: TableRow,
    fid_column: &str,
    geom_column: &str,
    geom_decoder: &F,
) -> Result<Feature, FeaturesError>
where
    F: Fn(&[u8]) -> Result<geo_types::Geometry<f64>, FeaturesError>,
{
    let mut feature = Feature::new(0);
    let mut found_fid = false;

    for (column_name, value) in row.columns {
        if matches!(value, ColumnValue::Null) {
            continue;
        }

        if column_name == fid_column {
            match value {
                ColumnValue::Integer(id) => {
                    feature.id = id;
                    found_fid = true;
                }
                other => {
                    return Err(FeaturesError::RowMappingError(format!(
                        "feature ID column {} must hold a 64-bit integer, got {:?}",
                        fid_column, other
                    )));
                }
            }
        } else if column_name == geom_column {
            let raw_geom = match value {
                ColumnValue::Bytes(bytes) => bytes,
                _ => {
                    return Err(FeaturesError::RowMappingError(format!(
                        "failed to read geometry from {} column in datasource",
                        geom_column
                    )));
                }
            };
            let decoded = geom_decoder(&raw_geom).map_err(|e| {
                FeaturesError::RowMappingError(format!(
                    "failed to map/decode geometry from datasource, error: {}",
                    e
                ))
            })?;
            feature.geometry = Some(Geometry::from(decoded));
        } else if FILTERING_HELPER_COLUMNS.contains(&column_name.as_str()) {
            continue;
        } else {
            let property = match value {
                ColumnValue::Bytes(bytes) => {
                    PropertyValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                ColumnValue::Integer(v) => PropertyValue::Integer(v),
                ColumnValue::Float(v) => PropertyValue::Float(v),
                ColumnValue::Text(v) => PropertyValue::Text(v),
                ColumnValue::Bool(v) => PropertyValue::Bool(v),
                ColumnValue::Timestamp(v) => PropertyValue::Timestamp(v),
                ColumnValue::Null => unreachable!("nulls are skipped above"),
            };
            feature.properties.insert(column_name, property);
        }
    }

    if !found_fid {
        return Err(FeaturesError::RowMappingError(format!(
            "feature ID column {} missing from result set",
            fid_column
        )));
    }
    Ok(feature)
}
