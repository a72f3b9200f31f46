//! GeoPackage datasource backed by a read-only SQLite pool.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use features_domain::{
    map_rows_to_features, ColumnValue, CursorPosition, Cursors, Feature, FeatureCollection,
    TableRow,
};
use ogc_common::{FeaturesError, FeaturesResult};

use crate::{CollectionTable, Datasource, FeaturesCriteria};

/// GeoPackage on local disk.
pub struct GeoPackageDatasource {
    pool: SqlitePool,
    tables: HashMap<String, CollectionTable>,
}

impl GeoPackageDatasource {
    /// Open a GeoPackage file read-only.
    pub async fn connect(
        file: &Path,
        collections: Vec<CollectionTable>,
    ) -> FeaturesResult<Self> {
        let options = SqliteConnectOptions::new().filename(file).read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|e| {
                FeaturesError::DatasourceError(format!(
                    "failed to open GeoPackage {}: {}",
                    file.display(),
                    e
                ))
            })?;
        tracing::info!("connected to local GeoPackage: {}", file.display());

        let tables = collections
            .into_iter()
            .map(|table| (table.id.clone(), table))
            .collect();
        Ok(Self { pool, tables })
    }

    /// Fetch one page of raw rows plus a flag telling whether a further
    /// page exists in the query direction. Overfetches by one row to
    /// detect the edge of the result set.
    async fn fetch_page(
        &self,
        table: &CollectionTable,
        criteria: &FeaturesCriteria,
        select: &str,
    ) -> FeaturesResult<(Vec<SqliteRow>, bool)> {
        let mut sql = format!(
            "SELECT {} FROM \"{}\" WHERE 1 = 1",
            select,
            table.table_name()
        );
        match criteria.cursor {
            CursorPosition::Start => {}
            CursorPosition::Next(_) => {
                sql.push_str(&format!(" AND \"{}\" > ?", table.fid_column));
            }
            CursorPosition::Previous(_) => {
                sql.push_str(&format!(" AND \"{}\" < ?", table.fid_column));
            }
        }
        if criteria.bbox.is_some() {
            // Overlap test against the conventional bbox helper columns.
            sql.push_str(" AND maxx >= ? AND minx <= ? AND maxy >= ? AND miny <= ?");
        }
        let descending = matches!(criteria.cursor, CursorPosition::Previous(_));
        sql.push_str(&format!(
            " ORDER BY \"{}\" {} LIMIT ?",
            table.fid_column,
            if descending { "DESC" } else { "ASC" }
        ));

        let mut query = sqlx::query(&sql);
        match criteria.cursor {
            CursorPosition::Next(after) => query = query.bind(after),
            CursorPosition::Previous(before) => query = query.bind(before),
            CursorPosition::Start => {}
        }
        if let Some(bbox) = &criteria.bbox {
            query = query
                .bind(bbox.min_x)
                .bind(bbox.max_x)
                .bind(bbox.min_y)
                .bind(bbox.max_y);
        }
        query = query.bind(criteria.limit as i64 + 1);

        let mut rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FeaturesError::DatasourceError(e.to_string()))?;

        let more = rows.len() > criteria.limit;
        rows.truncate(criteria.limit);
        Ok((rows, more))
    }
}

#[async_trait]
impl Datasource for GeoPackageDatasource {
    async fn get_feature_ids(
        &self,
        collection: &str,
        criteria: &FeaturesCriteria,
    ) -> FeaturesResult<(Vec<i64>, Cursors)> {
        let Some(table) = self.tables.get(collection) else {
            return Ok((Vec::new(), Cursors::default()));
        };
        let select = format!("\"{}\"", table.fid_column);
        let (rows, more) = self.fetch_page(table, criteria, &select).await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row
                .try_get(0)
                .map_err(|e| FeaturesError::DatasourceError(e.to_string()))?;
            ids.push(id);
        }
        ids.sort_unstable();

        let cursors = build_cursors(
            criteria.cursor,
            ids.first().copied(),
            ids.last().copied(),
            more,
            criteria.filters_checksum,
        );
        Ok((ids, cursors))
    }

    async fn get_features_by_id(
        &self,
        collection: &str,
        feature_ids: &[i64],
    ) -> FeaturesResult<FeatureCollection> {
        let Some(table) = self.tables.get(collection) else {
            return Ok(FeatureCollection::default());
        };
        if feature_ids.is_empty() {
            return Ok(FeatureCollection::default());
        }

        let placeholders = vec!["?"; feature_ids.len()].join(",");
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" IN ({})",
            table.table_name(),
            table.fid_column,
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for id in feature_ids {
            query = query.bind(id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| FeaturesError::DatasourceError(e.to_string()))?;

        let table_rows = rows
            .iter()
            .map(row_to_table_row)
            .collect::<FeaturesResult<Vec<_>>>()?;
        let features = map_rows_to_features(
            table_rows,
            &table.fid_column,
            &table.geom_column,
            decode_gpkg_geometry,
        )?;
        Ok(FeatureCollection::new(features))
    }

    async fn get_features(
        &self,
        collection: &str,
        criteria: &FeaturesCriteria,
    ) -> FeaturesResult<Option<(FeatureCollection, Cursors)>> {
        let Some(table) = self.tables.get(collection) else {
            return Ok(None);
        };
        let (rows, more) = self.fetch_page(table, criteria, "*").await?;

        let table_rows = rows
            .iter()
            .map(row_to_table_row)
            .collect::<FeaturesResult<Vec<_>>>()?;
        let features = map_rows_to_features(
            table_rows,
            &table.fid_column,
            &table.geom_column,
            decode_gpkg_geometry,
        )?;

        let cursors = build_cursors(
            criteria.cursor,
            features.first().map(|f| f.id),
            features.last().map(|f| f.id),
            more,
            criteria.filters_checksum,
        );
        Ok(Some((FeatureCollection::new(features), cursors)))
    }

    async fn get_feature(
        &self,
        collection: &str,
        feature_id: i64,
    ) -> FeaturesResult<Option<Feature>> {
        let Some(table) = self.tables.get(collection) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = ? LIMIT 1",
            table.table_name(),
            table.fid_column
        );
        let row = sqlx::query(&sql)
            .bind(feature_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| FeaturesError::DatasourceError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let features = map_rows_to_features(
            vec![row_to_table_row(&row)?],
            &table.fid_column,
            &table.geom_column,
            decode_gpkg_geometry,
        )?;
        Ok(features.into_iter().next())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Issue prev/next cursors for a page of ascending feature ids.
///
/// Coming from `Start` there is nothing before the page; navigating
/// forward there is always something behind us; navigating backward
/// there is always something ahead. The overfetch flag decides the
/// remaining side.
fn build_cursors(
    direction: CursorPosition,
    first_id: Option<i64>,
    last_id: Option<i64>,
    more: bool,
    filters_checksum: u32,
) -> Cursors {
    match direction {
        CursorPosition::Start => {
            Cursors::new(None, if more { last_id } else { None }, filters_checksum)
        }
        CursorPosition::Next(_) => Cursors::new(
            first_id,
            if more { last_id } else { None },
            filters_checksum,
        ),
        CursorPosition::Previous(_) => Cursors::new(
            if more { first_id } else { None },
            last_id,
            filters_checksum,
        ),
    }
}

/// Convert a SQLite row into the mapper's runtime-typed representation.
/// Fails closed on column types the feature model cannot represent.
fn row_to_table_row(row: &SqliteRow) -> FeaturesResult<TableRow> {
    let mut columns = Vec::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(i)
            .map_err(|e| FeaturesError::DatasourceError(e.to_string()))?;

        let value = if raw.is_null() {
            ColumnValue::Null
        } else {
            let type_name = raw.type_info().name().to_uppercase();
            match type_name.as_str() {
                "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => {
                    ColumnValue::Integer(get_column(row, i)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
                    ColumnValue::Float(get_column(row, i)?)
                }
                "TEXT" | "VARCHAR" => ColumnValue::Text(get_column(row, i)?),
                "BLOB" => ColumnValue::Bytes(get_column(row, i)?),
                "BOOLEAN" => ColumnValue::Bool(get_column(row, i)?),
                "DATETIME" | "TIMESTAMP" | "DATE" => {
                    ColumnValue::Timestamp(get_column::<DateTime<Utc>>(row, i)?)
                }
                other => {
                    return Err(FeaturesError::RowMappingError(format!(
                        "unexpected type for sqlite column {}: {}",
                        column.name(),
                        other
                    )));
                }
            }
        };
        columns.push((column.name().to_string(), value));
    }
    Ok(TableRow::new(columns))
}

fn get_column<'r, T>(row: &'r SqliteRow, index: usize) -> FeaturesResult<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(index)
        .map_err(|e| FeaturesError::DatasourceError(e.to_string()))
}

/// Decode a GeoPackage geometry blob: the GP binary header (magic,
/// version, flags, SRID, optional envelope) followed by ISO WKB.
/// See <https://www.geopackage.org/spec130/#gpb_format>.
fn decode_gpkg_geometry(raw: &[u8]) -> FeaturesResult<geo_types::Geometry<f64>> {
    if raw.len() < 8 || raw[0] != 0x47 || raw[1] != 0x50 {
        return Err(FeaturesError::RowMappingError(
            "geometry blob is missing the GeoPackage header".to_string(),
        ));
    }
    let flags = raw[3];
    let envelope_length = match (flags >> 1) & 0b111 {
        0 => 0,
        1 => 32,
        2 | 3 => 48,
        4 => 64,
        other => {
            return Err(FeaturesError::RowMappingError(format!(
                "invalid GeoPackage envelope indicator: {}",
                other
            )));
        }
    };

    let wkb_start = 8 + envelope_length;
    if raw.len() <= wkb_start {
        return Err(FeaturesError::RowMappingError(
            "geometry blob truncated before WKB payload".to_string(),
        ));
    }

    let mut wkb_bytes = &raw[wkb_start..];
    wkb::wkb_to_geom(&mut wkb_bytes)
        .map_err(|e| FeaturesError::RowMappingError(format!("invalid WKB geometry: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use features_domain::PropertyValue;
    use sqlx::{ConnectOptions, Connection};

    /// GeoPackage blob for a 2D point: GP header without envelope plus
    /// little-endian ISO WKB.
    fn gpkg_point(x: f64, y: f64) -> Vec<u8> {
        let mut blob = vec![0x47, 0x50, 0x00, 0x01];
        blob.extend_from_slice(&4326i32.to_le_bytes());
        blob.push(0x01); // little endian wkb
        blob.extend_from_slice(&1u32.to_le_bytes()); // point
        blob.extend_from_slice(&x.to_le_bytes());
        blob.extend_from_slice(&y.to_le_bytes());
        blob
    }

    async fn seed_geopackage(path: &Path, feature_count: i64) {
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE buildings (
                fid INTEGER PRIMARY KEY,
                geom BLOB,
                name TEXT,
                height REAL,
                minx REAL, miny REAL, maxx REAL, maxy REAL
            )",
        )
        .execute(&mut conn)
        .await
        .unwrap();

        for i in 1..=feature_count {
            let x = i as f64;
            sqlx::query(
                "INSERT INTO buildings (fid, geom, name, height, minx, miny, maxx, maxy)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(i)
            .bind(gpkg_point(x, 52.0))
            .bind(format!("building {}", i))
            .bind(10.5 * i as f64)
            .bind(x)
            .bind(52.0)
            .bind(x)
            .bind(52.0)
            .execute(&mut conn)
            .await
            .unwrap();
        }
        conn.close().await.unwrap();
    }

    async fn datasource(path: &Path) -> GeoPackageDatasource {
        GeoPackageDatasource::connect(path, vec![CollectionTable::new("buildings")])
            .await
            .unwrap()
    }

    fn criteria(cursor: CursorPosition, limit: usize) -> FeaturesCriteria {
        FeaturesCriteria {
            cursor,
            limit,
            ..Default::default()
        }
    }

    fn ids(fc: &FeatureCollection) -> Vec<i64> {
        fc.features.iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_first_page_and_next_cursor() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 5).await;
        let ds = datasource(file.path()).await;

        let (fc, cursors) = ds
            .get_features("buildings", &criteria(CursorPosition::Start, 2))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ids(&fc), vec![1, 2]);
        assert_eq!(fc.number_returned, 2);
        assert!(cursors.prev.is_none());
        assert!(cursors.next.is_some());

        let feature = &fc.features[0];
        assert_eq!(
            feature.properties.get("name"),
            Some(&PropertyValue::Text("building 1".to_string()))
        );
        assert!(feature.geometry.is_some());
        // bbox helper columns must not leak into properties
        assert!(feature.properties.get("minx").is_none());
    }

    #[tokio::test]
    async fn test_forward_and_backward_navigation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 5).await;
        let ds = datasource(file.path()).await;

        let (fc, cursors) = ds
            .get_features("buildings", &criteria(CursorPosition::Next(2), 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&fc), vec![3, 4]);
        assert!(cursors.prev.is_some());
        assert!(cursors.next.is_some());

        // backward from the start of that page: previous page, re-ascended
        let (fc, cursors) = ds
            .get_features("buildings", &criteria(CursorPosition::Previous(3), 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&fc), vec![1, 2]);
        assert!(cursors.prev.is_none(), "left edge reached");
        assert!(cursors.next.is_some());
    }

    #[tokio::test]
    async fn test_last_page_has_no_next() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 5).await;
        let ds = datasource(file.path()).await;

        let (fc, cursors) = ds
            .get_features("buildings", &criteria(CursorPosition::Next(4), 2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ids(&fc), vec![5]);
        assert!(cursors.next.is_none());
        assert!(cursors.prev.is_some());
    }

    #[tokio::test]
    async fn test_bbox_filtering() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 5).await;
        let ds = datasource(file.path()).await;

        let mut crit = criteria(CursorPosition::Start, 10);
        crit.bbox = Some(ogc_common::BoundingBox::new(1.5, 50.0, 3.5, 53.0));
        let (fc, _) = ds.get_features("buildings", &crit).await.unwrap().unwrap();
        assert_eq!(ids(&fc), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_none() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 1).await;
        let ds = datasource(file.path()).await;

        let result = ds
            .get_features("no-such-collection", &criteria(CursorPosition::Start, 2))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_get_single_feature() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 3).await;
        let ds = datasource(file.path()).await;

        let feature = ds.get_feature("buildings", 2).await.unwrap().unwrap();
        assert_eq!(feature.id, 2);
        assert_eq!(
            feature.properties.get("height"),
            Some(&PropertyValue::Float(21.0))
        );

        assert!(ds.get_feature("buildings", 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_feature_ids_then_bulk_fetch() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 5).await;
        let ds = datasource(file.path()).await;

        let (feature_ids, cursors) = ds
            .get_feature_ids("buildings", &criteria(CursorPosition::Start, 3))
            .await
            .unwrap();
        assert_eq!(feature_ids, vec![1, 2, 3]);
        assert!(cursors.next.is_some());

        let fc = ds
            .get_features_by_id("buildings", &feature_ids)
            .await
            .unwrap();
        assert_eq!(fc.number_returned, 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        seed_geopackage(file.path(), 1).await;
        let ds = datasource(file.path()).await;

        ds.close().await;
        ds.close().await;
    }

    #[test]
    fn test_decode_gpkg_geometry_rejects_garbage() {
        assert!(decode_gpkg_geometry(&[0x00, 0x01]).is_err());
        assert!(decode_gpkg_geometry(b"notageopackage").is_err());

        let decoded = decode_gpkg_geometry(&gpkg_point(5.0, 52.0)).unwrap();
        match decoded {
            geo_types::Geometry::Point(p) => {
                assert_eq!(p.x(), 5.0);
                assert_eq!(p.y(), 52.0);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }
}
