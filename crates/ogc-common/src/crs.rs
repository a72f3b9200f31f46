//! Spatial reference system identifiers.
//!
//! SRIDs are carried as plain numeric codes. The value `0` means
//! "unspecified": it only resolves to the WGS84 default at the point of
//! use, so "unspecified" and "explicit default" stay distinguishable
//! until a caller actually needs a concrete value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FeaturesError;

/// SRID of WGS84, the default output CRS.
pub const WGS84_SRID: i32 = 4326;

/// Sentinel for "no CRS specified, use context default".
pub const UNDEFINED_SRID: i32 = 0;

/// OGC URI prefix for CRS identifiers in query parameters.
pub const CRS_URL_PREFIX: &str = "http://www.opengis.net/def/crs/";

/// OGC code for WGS84 with lon/lat axis order.
const WGS84_CODE_OGC: &str = "CRS84";

/// A spatial reference system identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Srid(pub i32);

impl Srid {
    /// The undefined SRID, resolving to WGS84 on use.
    pub const UNDEFINED: Srid = Srid(UNDEFINED_SRID);

    /// Resolve to a concrete SRID, falling back to WGS84 when unspecified.
    pub fn get_or_default(&self) -> i32 {
        if self.0 <= UNDEFINED_SRID {
            WGS84_SRID
        } else {
            self.0
        }
    }

    /// Whether no CRS was specified.
    pub fn is_undefined(&self) -> bool {
        self.0 == UNDEFINED_SRID
    }

    /// Two SRIDs are the same when equal, or when one is the WGS84
    /// default and the other is unspecified.
    pub fn is_same_as(&self, other: Srid) -> bool {
        self.0 == other.0
            || (self.0 == UNDEFINED_SRID && other.0 == WGS84_SRID)
            || (self.0 == WGS84_SRID && other.0 == UNDEFINED_SRID)
    }

    /// Parse a CRS query parameter value such as
    /// `http://www.opengis.net/def/crs/EPSG/0/28992` or
    /// `http://www.opengis.net/def/crs/OGC/1.3/CRS84`.
    ///
    /// CRS84 is WGS84, just like EPSG:4326 (only the axis order differs,
    /// the SRID is the same). `param_name` is used in error messages only.
    pub fn parse(param_name: &str, value: &str) -> Result<Srid, FeaturesError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Srid::UNDEFINED);
        }
        if !value.starts_with(CRS_URL_PREFIX) {
            return Err(FeaturesError::InvalidCrs(format!(
                "{} param should start with {}, got: {}",
                param_name, CRS_URL_PREFIX, value
            )));
        }
        let crs_code = match value.rfind('/') {
            Some(idx) => &value[idx + 1..],
            None => return Ok(Srid::UNDEFINED),
        };
        if crs_code == WGS84_CODE_OGC {
            return Ok(Srid(WGS84_SRID));
        }
        let code: i32 = crs_code.parse().map_err(|_| {
            FeaturesError::InvalidCrs(format!(
                "expected numerical CRS code, received: {}",
                crs_code
            ))
        })?;
        Ok(Srid(code))
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.get_or_default())
    }
}

impl From<i32> for Srid {
    fn from(code: i32) -> Self {
        Srid(code)
    }
}
