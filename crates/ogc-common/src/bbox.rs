//! Bounding box type and parsing.

use serde::{Deserialize, Serialize};

use crate::error::FeaturesError;

/// An axis-aligned bounding box used to spatially filter features.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, etc.), coordinates are in the unit of
/// the projection, typically meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse an OGC `bbox` query parameter: "minx,miny,maxx,maxy".
    pub fn from_query_string(s: &str) -> Result<Self, FeaturesError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(FeaturesError::InvalidBbox(
                "bbox should contain exactly 4 values separated by commas: minx,miny,maxx,maxy"
                    .to_string(),
            ));
        }

        let mut values = [0f64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part.parse().map_err(|e| {
                FeaturesError::InvalidBbox(format!(
                    "failed to parse value {} in bbox, error: {}",
                    part, e
                ))
            })?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }
}
