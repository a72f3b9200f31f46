//! Shared types for the feature server: error taxonomy, bounding boxes
//! and spatial reference system identifiers.

pub mod bbox;
pub mod crs;
pub mod error;

pub use bbox::BoundingBox;
pub use crs::Srid;
pub use error::{FeaturesError, FeaturesResult};
