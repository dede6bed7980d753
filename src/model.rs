//! In-memory model of a GeoJSON feature collection.
//!
//! Geometries are an explicit recursive enum, one case per GeoJSON kind, and
//! attribute values are a closed set of scalars.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Number;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::{GeometryDefect, PurgeError};

/// A single position with optional elevation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Coord { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Coord { x, y, z: Some(z) }
    }

    /// Number of ordinates, 2 or 3
    pub fn dimensions(&self) -> usize {
        if self.z.is_some() {
            3
        } else {
            2
        }
    }

    /// Total order over ordinates: x, then y, then z (2D before 3D)
    pub fn total_cmp(&self, other: &Coord) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
            .then_with(|| match (self.z, other.z) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.total_cmp(&b),
            })
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// The tag of a [`Geometry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        };
        f.write_str(name)
    }
}

/// A GeoJSON geometry. Nesting depth of the coordinates follows the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Exterior ring first, then holes
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Check that all ordinates are finite and that the geometry is either
    /// entirely 2D or entirely 3D. Members of a collection are checked one by
    /// one, so a collection may mix a 2D member with a 3D one.
    pub fn validate(&self) -> Result<(), GeometryDefect> {
        if let Geometry::GeometryCollection(members) = self {
            return members.iter().try_for_each(Geometry::validate);
        }

        let mut dimensions = None;
        self.try_for_each_coord(|c| {
            if !c.is_finite() {
                return Err(GeometryDefect::NonFinite);
            }
            match dimensions {
                None => dimensions = Some(c.dimensions()),
                Some(d) if d != c.dimensions() => {
                    return Err(GeometryDefect::MixedDimensionality)
                }
                Some(_) => {}
            }
            Ok(())
        })
    }
}

/// A scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    /// Kept as the exact JSON number so it is written back unchanged
    Number(Number),
    String(String),
    /// RFC 3339 rendering of a point in time
    Timestamp(String),
}

impl PropertyValue {
    /// Normalize a point in time to its string form
    pub fn timestamp(at: OffsetDateTime) -> Result<Self, PurgeError> {
        Ok(PropertyValue::Timestamp(at.format(&Rfc3339)?))
    }

    /// `null` or the empty string
    pub fn is_blank(&self) -> bool {
        match self {
            PropertyValue::Null => true,
            PropertyValue::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::String(s) | PropertyValue::Timestamp(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Number(n.into())
    }
}

impl From<f64> for PropertyValue {
    /// Non-finite numbers have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(PropertyValue::Null, PropertyValue::Number)
    }
}

/// Attribute mapping of a feature, in document order
pub type Properties = IndexMap<String, PropertyValue>;

/// One geometry with its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<geojson::feature::Id>,
    pub bbox: Option<geojson::Bbox>,
    pub geometry: Geometry,
    pub properties: Properties,
    pub foreign_members: Option<geojson::JsonObject>,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Feature {
            id: None,
            bbox: None,
            geometry,
            properties,
            foreign_members: None,
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub bbox: Option<geojson::Bbox>,
    pub foreign_members: Option<geojson::JsonObject>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            features,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Validate every feature's geometry, failing on the first bad one
    pub fn validate(&self) -> Result<(), PurgeError> {
        for (i, feature) in self.features.iter().enumerate() {
            feature
                .geometry
                .validate()
                .map_err(|defect| defect.at(i, feature.geometry.kind()))?;
        }
        Ok(())
    }
}
