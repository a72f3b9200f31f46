//! GeoJSON-shaped feature types.
//!
//! Features are GeoJSON Features with extras such as links and a
//! required integer `id`. Feature ids are expected to be
//! auto-incrementing integers (the default in GeoPackages) since they
//! double as the sort key for cursor-based pagination.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GeoJSON FeatureCollection with extras such as links and a
/// `numberReturned` count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Navigation links (self/next/prev).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<Link>,

    /// Number of features in this page.
    #[serde(rename = "numberReturned")]
    pub number_returned: usize,

    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// The features on this page, ascending by id.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a collection from a page of features.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            links: Vec::new(),
            number_returned: features.len(),
            type_: "FeatureCollection".to_string(),
            features,
        }
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A GeoJSON Feature with extras such as links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Required integer identity, unique and monotonically assigned
    /// within a collection.
    pub id: i64,

    /// Navigation links (self/collection).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<Link>,

    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// The geometry of this feature, if any.
    pub geometry: Option<Geometry>,

    /// Feature attributes.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Feature {
    /// Create an empty feature with the given id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            links: Vec::new(),
            type_: "Feature".to_string(),
            geometry: None,
            properties: BTreeMap::new(),
        }
    }
}

/// Link according to RFC 8288.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub rel: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub type_: Option<String>,

    pub href: String,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            title: None,
            type_: None,
            href: href.into(),
        }
    }

    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A typed feature attribute value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

/// GeoJSON geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [x, y] / [longitude, latitude].
        coordinates: [f64; 2],
    },

    /// A line string geometry.
    LineString {
        coordinates: Vec<[f64; 2]>,
    },

    /// A polygon: exterior ring followed by interior rings.
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },

    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },

    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },

    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },

    GeometryCollection {
        geometries: Vec<Geometry>,
    },
}

fn coord(c: geo_types::Coord<f64>) -> [f64; 2] {
    [c.x, c.y]
}

fn line_string(ls: &geo_types::LineString<f64>) -> Vec<[f64; 2]> {
    ls.coords().map(|c| coord(*c)).collect()
}

fn polygon(p: &geo_types::Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    let mut rings = Vec::with_capacity(p.interiors().len() + 1);
    rings.push(line_string(p.exterior()));
    for interior in p.interiors() {
        rings.push(line_string(interior));
    }
    rings
}

impl From<&geo_types::Geometry<f64>> for Geometry {
    fn from(geom: &geo_types::Geometry<f64>) -> Self {
        use geo_types::Geometry as G;
        match geom {
            G::Point(p) => Geometry::Point {
                coordinates: [p.x(), p.y()],
            },
            G::Line(l) => Geometry::LineString {
                coordinates: vec![coord(l.start), coord(l.end)],
            },
            G::LineString(ls) => Geometry::LineString {
                coordinates: line_string(ls),
            },
            G::Polygon(p) => Geometry::Polygon {
                coordinates: polygon(p),
            },
            G::MultiPoint(mp) => Geometry::MultiPoint {
                coordinates: mp.iter().map(|p| [p.x(), p.y()]).collect(),
            },
            G::MultiLineString(mls) => Geometry::MultiLineString {
                coordinates: mls.iter().map(line_string).collect(),
            },
            G::MultiPolygon(mp) => Geometry::MultiPolygon {
                coordinates: mp.iter().map(polygon).collect(),
            },
            G::GeometryCollection(gc) => Geometry::GeometryCollection {
                geometries: gc.iter().map(Geometry::from).collect(),
            },
            G::Rect(r) => Geometry::Polygon {
                coordinates: polygon(&r.to_polygon()),
            },
            G::Triangle(t) => Geometry::Polygon {
                coordinates: polygon(&t.to_polygon()),
            },
        }
    }
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(geom: geo_types::Geometry<f64>) -> Self {
        Geometry::from(&geom)
    }
}
