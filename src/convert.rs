use geojson::{GeoJson, Value as GeoJsonValue};
use serde_json::Value as JsonValue;

use crate::error::{GeometryDefect, PurgeError};
use crate::model::{
    Coord, Feature, FeatureCollection, Geometry, GeometryKind, Properties, PropertyValue,
};

/// Convert a parsed GeoJSON document into a [`FeatureCollection`].
///
/// A lone `Feature` is wrapped into a collection of one. A bare geometry is
/// rejected since it has no attributes to work with.
pub fn collection_from_geojson(geojson: GeoJson) -> Result<FeatureCollection, PurgeError> {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            let features = fc
                .features
                .into_iter()
                .enumerate()
                .map(|(i, feature)| feature_from_geojson(i, feature))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FeatureCollection {
                features,
                bbox: fc.bbox,
                foreign_members: fc.foreign_members,
            })
        }
        GeoJson::Feature(feature) => Ok(FeatureCollection::new(vec![feature_from_geojson(
            0, feature,
        )?])),
        GeoJson::Geometry(_) => Err(PurgeError::UnsupportedDocument { found: "Geometry" }),
    }
}

/// Convert a raw JSON document into a [`FeatureCollection`].
///
/// Features are decoded one at a time so that a bad geometry is reported
/// with the index of the feature carrying it.
pub fn collection_from_json(mut json: JsonValue) -> Result<FeatureCollection, PurgeError> {
    let tag = json.get("type").and_then(JsonValue::as_str).map(str::to_owned);
    match tag.as_deref() {
        Some("FeatureCollection") => {
            // leave an empty array behind so the envelope still parses
            let features = match json.get_mut("features") {
                Some(JsonValue::Array(features)) => std::mem::take(features),
                _ => Vec::new(),
            };
            let envelope = geojson::FeatureCollection::from_json_value(json)?;
            let features = features
                .into_iter()
                .enumerate()
                .map(|(i, feature)| feature_from_json(i, feature))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FeatureCollection {
                features,
                bbox: envelope.bbox,
                foreign_members: envelope.foreign_members,
            })
        }
        Some("Feature") => Ok(FeatureCollection::new(vec![feature_from_json(0, json)?])),
        _ => collection_from_geojson(GeoJson::from_json_value(json)?),
    }
}

fn feature_from_json(index: usize, mut json: JsonValue) -> Result<Feature, PurgeError> {
    let geometry = match &mut json {
        JsonValue::Object(object) => object.insert("geometry".to_string(), JsonValue::Null),
        _ => None,
    };
    let feature = geojson::Feature::from_json_value(json)?;
    let geometry = match geometry {
        None | Some(JsonValue::Null) => return Err(PurgeError::MissingGeometry { feature: index }),
        Some(geometry) => geometry_from_json(index, geometry)?,
    };
    Ok(with_geometry(feature, geometry))
}

fn geometry_from_json(index: usize, json: JsonValue) -> Result<Geometry, PurgeError> {
    let tag = json
        .get("type")
        .and_then(JsonValue::as_str)
        .unwrap_or("untyped")
        .to_owned();
    let geometry = geojson::Geometry::from_json_value(json).map_err(|err| {
        let defect = match err {
            geojson::Error::GeometryUnknownType(_) => GeometryDefect::UnknownType,
            geojson::Error::PositionTooShort(found) => GeometryDefect::OrdinateCount { found },
            _ => GeometryDefect::Nesting,
        };
        defect.at(index, &tag)
    })?;
    geometry_from_geojson(&geometry.value)
        .map_err(|defect| defect.at(index, geojson_kind(&geometry.value)))
}

fn feature_from_geojson(index: usize, feature: geojson::Feature) -> Result<Feature, PurgeError> {
    let geometry = match &feature.geometry {
        Some(geometry) => geometry_from_geojson(&geometry.value)
            .map_err(|defect| defect.at(index, geojson_kind(&geometry.value)))?,
        None => return Err(PurgeError::MissingGeometry { feature: index }),
    };
    Ok(with_geometry(feature, geometry))
}

fn with_geometry(feature: geojson::Feature, geometry: Geometry) -> Feature {
    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, property_from_json(v)))
        .collect();

    Feature {
        id: feature.id,
        bbox: feature.bbox,
        geometry,
        properties,
        foreign_members: feature.foreign_members,
    }
}

/// Convert a GeoJSON geometry value, checking ordinate counts
pub fn geometry_from_geojson(value: &GeoJsonValue) -> Result<Geometry, GeometryDefect> {
    Ok(match value {
        GeoJsonValue::Point(position) => Geometry::Point(coord(position)?),
        GeoJsonValue::MultiPoint(positions) => Geometry::MultiPoint(seq(positions)?),
        GeoJsonValue::LineString(positions) => Geometry::LineString(seq(positions)?),
        GeoJsonValue::MultiLineString(lines) => Geometry::MultiLineString(nested(lines)?),
        GeoJsonValue::Polygon(rings) => Geometry::Polygon(nested(rings)?),
        GeoJsonValue::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons
                .iter()
                .map(|rings| nested(rings))
                .collect::<Result<_, _>>()?,
        ),
        GeoJsonValue::GeometryCollection(members) => Geometry::GeometryCollection(
            members
                .iter()
                .map(|g| geometry_from_geojson(&g.value))
                .collect::<Result<_, _>>()?,
        ),
    })
}

fn coord(position: &[f64]) -> Result<Coord, GeometryDefect> {
    match *position {
        [x, y] => Ok(Coord::xy(x, y)),
        [x, y, z] => Ok(Coord::xyz(x, y, z)),
        _ => Err(GeometryDefect::OrdinateCount {
            found: position.len(),
        }),
    }
}

fn seq(positions: &[Vec<f64>]) -> Result<Vec<Coord>, GeometryDefect> {
    positions.iter().map(|p| coord(p)).collect()
}

fn nested(lines: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Coord>>, GeometryDefect> {
    lines.iter().map(|l| seq(l)).collect()
}

fn geojson_kind(value: &GeoJsonValue) -> GeometryKind {
    match value {
        GeoJsonValue::Point(_) => GeometryKind::Point,
        GeoJsonValue::MultiPoint(_) => GeometryKind::MultiPoint,
        GeoJsonValue::LineString(_) => GeometryKind::LineString,
        GeoJsonValue::MultiLineString(_) => GeometryKind::MultiLineString,
        GeoJsonValue::Polygon(_) => GeometryKind::Polygon,
        GeoJsonValue::MultiPolygon(_) => GeometryKind::MultiPolygon,
        GeoJsonValue::GeometryCollection(_) => GeometryKind::GeometryCollection,
    }
}

/// Nested arrays and objects are flattened to their JSON text
pub fn property_from_json(value: JsonValue) -> PropertyValue {
    match value {
        JsonValue::Null => PropertyValue::Null,
        JsonValue::Bool(b) => PropertyValue::Bool(b),
        JsonValue::Number(n) => PropertyValue::Number(n),
        JsonValue::String(s) => PropertyValue::String(s),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
            PropertyValue::String(nested.to_string())
        }
    }
}

pub fn property_to_json(value: &PropertyValue) -> JsonValue {
    match value {
        PropertyValue::Null => JsonValue::Null,
        PropertyValue::Bool(b) => JsonValue::Bool(*b),
        PropertyValue::Number(n) => JsonValue::Number(n.clone()),
        PropertyValue::String(s) | PropertyValue::Timestamp(s) => JsonValue::String(s.clone()),
    }
}

pub fn collection_to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: collection.bbox.clone(),
        features: collection.features.iter().map(feature_to_geojson).collect(),
        foreign_members: collection.foreign_members.clone(),
    }
}

fn feature_to_geojson(feature: &Feature) -> geojson::Feature {
    geojson::Feature {
        bbox: feature.bbox.clone(),
        geometry: Some(geometry_to_geojson(&feature.geometry)),
        id: feature.id.clone(),
        properties: Some(properties_to_json(&feature.properties)),
        foreign_members: feature.foreign_members.clone(),
    }
}

fn properties_to_json(properties: &Properties) -> geojson::JsonObject {
    properties
        .iter()
        .map(|(k, v)| (k.clone(), property_to_json(v)))
        .collect()
}

pub fn geometry_to_geojson(geometry: &Geometry) -> geojson::Geometry {
    geojson::Geometry::new(geometry_value(geometry))
}

fn geometry_value(geometry: &Geometry) -> GeoJsonValue {
    match geometry {
        Geometry::Point(c) => GeoJsonValue::Point(position(c)),
        Geometry::MultiPoint(points) => GeoJsonValue::MultiPoint(positions(points)),
        Geometry::LineString(line) => GeoJsonValue::LineString(positions(line)),
        Geometry::MultiLineString(lines) => {
            GeoJsonValue::MultiLineString(lines.iter().map(|l| positions(l)).collect())
        }
        Geometry::Polygon(rings) => {
            GeoJsonValue::Polygon(rings.iter().map(|r| positions(r)).collect())
        }
        Geometry::MultiPolygon(polygons) => GeoJsonValue::MultiPolygon(
            polygons
                .iter()
                .map(|rings| rings.iter().map(|r| positions(r)).collect())
                .collect(),
        ),
        Geometry::GeometryCollection(members) => {
            GeoJsonValue::GeometryCollection(members.iter().map(geometry_to_geojson).collect())
        }
    }
}

fn position(c: &Coord) -> Vec<f64> {
    match c.z {
        Some(z) => vec![c.x, c.y, z],
        None => vec![c.x, c.y],
    }
}

fn positions(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(position).collect()
}
