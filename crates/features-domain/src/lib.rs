//! Domain model for geospatial features.
//!
//! Contains the GeoJSON-shaped feature types, the opaque pagination
//! cursor codec and the datasource-agnostic row-to-feature mapper.

pub mod cursor;
pub mod feature;
pub mod mapper;
pub mod responses;

pub use cursor::{Cursors, CursorPosition, EncodedCursor};
pub use feature::{Feature, FeatureCollection, Geometry, Link, PropertyValue};
pub use mapper::{map_rows_to_features, ColumnValue, TableRow};
pub use responses::ExceptionResponse;
