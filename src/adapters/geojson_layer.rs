use geojson::{feature::Id, Feature as GeoJsonFeature, FeatureCollection, GeoJson, JsonObject};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::core::perimeter::{circle_polygon, PerimeterReport};
use crate::core::projection::reproject_geometry;
use crate::core::LayerSource;
use crate::domain::model::{BufferSet, Crs, Feature, Layer};
use crate::utils::error::{AccError, Result};
use crate::utils::validation::validate_file_extension;

pub const LAYER_EXTENSIONS: &[&str] = &["geojson", "json"];

/// A GeoJSON file on disk.
#[derive(Debug, Clone)]
pub struct GeoJsonFile {
    path: PathBuf,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LayerSource for GeoJsonFile {
    fn load_layer(&self) -> Result<Layer> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_layer(&content)
    }

    fn describe(&self) -> String {
        format!("GeoJSON file {}", self.path.display())
    }
}

/// Picks a reader from the file extension.
pub fn open_layer_source(path: &str) -> Result<Box<dyn LayerSource>> {
    validate_file_extension("layer", path, LAYER_EXTENSIONS)?;
    Ok(Box::new(GeoJsonFile::new(path)))
}

/// Parses a FeatureCollection, a single Feature or a bare Geometry.
///
/// The legacy `crs` member is honoured; without one the layer is WGS84 as
/// RFC 7946 mandates.
pub fn parse_layer(content: &str) -> Result<Layer> {
    let geojson: GeoJson = content.parse()?;

    let (declared, features) = match geojson {
        GeoJson::FeatureCollection(collection) => {
            let declared = declared_crs(collection.foreign_members.as_ref())?;
            let features = collection
                .features
                .into_iter()
                .map(convert_feature)
                .collect::<Result<Vec<_>>>()?;
            (declared, features)
        }
        GeoJson::Feature(feature) => {
            let declared = declared_crs(feature.foreign_members.as_ref())?;
            (declared, vec![convert_feature(feature)?])
        }
        GeoJson::Geometry(geometry) => {
            let declared = declared_crs(geometry.foreign_members.as_ref())?;
            let feature = Feature {
                id: String::new(),
                geometry: Some(geo::Geometry::<f64>::try_from(geometry)?),
                properties: serde_json::Map::new(),
            };
            (declared, vec![feature])
        }
    };

    let crs = declared.unwrap_or(Crs::Wgs84);
    tracing::debug!("Parsed {} features in {}", features.len(), crs);
    Ok(Layer {
        crs: Some(crs),
        features,
    })
}

fn declared_crs(members: Option<&JsonObject>) -> Result<Option<Crs>> {
    let Some(crs) = members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| AccError::ReferenceSystemMismatchError {
            expected: "a named crs member".to_string(),
            found: crs.to_string(),
        })?;

    Crs::from_identifier(name)
        .map(Some)
        .ok_or_else(|| AccError::ReferenceSystemMismatchError {
            expected: format!("{} or {}", Crs::Wgs84, Crs::Lambert93),
            found: name.to_string(),
        })
}

fn convert_feature(feature: GeoJsonFeature) -> Result<Feature> {
    let properties = feature.properties.unwrap_or_default();
    let id = match feature.id {
        Some(Id::String(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => match properties.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
    };
    let geometry = feature
        .geometry
        .map(geo::Geometry::<f64>::try_from)
        .transpose()?;

    Ok(Feature {
        id,
        geometry,
        properties,
    })
}

fn to_feature(geometry: &geo::Geometry<f64>, properties: JsonObject) -> GeoJsonFeature {
    GeoJsonFeature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn properties(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

/// Buffers as WGS84 features, outermost last, plus the production point.
pub fn buffers_to_feature_collection(set: &BufferSet) -> Result<FeatureCollection> {
    let mut features = Vec::with_capacity(set.len() + 1);

    for buffer in set.iter() {
        let geometry = reproject_geometry(
            &geo::Geometry::Polygon(buffer.geometry.clone()),
            set.crs,
            Crs::Wgs84,
        )?;
        features.push(to_feature(
            &geometry,
            properties(json!({
                "name": buffer.name,
                "radius_m": buffer.radius_m,
                "inner_radius_m": buffer.inner_radius_m,
                "mode": set.mode,
            })),
        ));
    }

    let origin = geo::Geometry::Point(set.origin.into());
    features.push(to_feature(
        &origin,
        properties(json!({ "name": "production point" })),
    ));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// The D/2 circle and every participant, in WGS84.
pub fn perimeter_to_feature_collection(
    report: &PerimeterReport,
    segments: usize,
) -> Result<FeatureCollection> {
    let circle = circle_polygon(&report.center, report.limit_km, segments)?;
    let mut features = vec![to_feature(
        &geo::Geometry::Polygon(circle),
        properties(json!({
            "name": format!("ACC D={:.2}km", report.diameter_km),
            "radius_km": report.limit_km,
            "center": [report.center.lon, report.center.lat],
            "compliant": report.compliant,
        })),
    )];
    features.extend(report.placements.iter().map(|placement| {
        let mut feature = to_feature(
            &geo::Geometry::Point(placement.location.into()),
            properties(json!({
                "id": placement.id,
                "name": placement.name,
                "type": placement.kind,
                "distance_km": placement.distance_km,
                "inside": placement.inside,
            })),
        );
        feature.id = Some(Id::Number(placement.id.into()));
        feature
    }));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

pub fn write_feature_collection(path: impl AsRef<Path>, collection: &FeatureCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(collection)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buffers::generate_buffers;
    use crate::domain::model::{BufferSettings, GeoPoint};

    const LAMBERT_COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::2154" } },
        "features": [
            {
                "type": "Feature",
                "id": "well-1",
                "geometry": { "type": "Point", "coordinates": [700000.0, 6600000.0] },
                "properties": { "kind": "well" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [700100.0, 6600000.0] },
                "properties": { "id": 42 }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {}
            }
        ]
    }"#;

    #[test]
    fn test_parse_collection_with_crs_member() {
        let layer = parse_layer(LAMBERT_COLLECTION).unwrap();
        assert_eq!(layer.crs, Some(Crs::Lambert93));
        assert_eq!(layer.len(), 3);
        assert_eq!(layer.features[0].id, "well-1");
        assert_eq!(layer.features[1].id, "42");
        assert_eq!(layer.features[2].id, "");
        assert!(layer.features[2].geometry.is_none());
        assert_eq!(layer.features[0].properties["kind"], "well");
    }

    #[test]
    fn test_missing_crs_defaults_to_wgs84() {
        let content = r#"{
            "type": "Feature",
            "id": 3,
            "geometry": { "type": "Point", "coordinates": [5.548, 45.055] },
            "properties": null
        }"#;
        let layer = parse_layer(content).unwrap();
        assert_eq!(layer.crs, Some(Crs::Wgs84));
        assert_eq!(layer.features[0].id, "3");
    }

    #[test]
    fn test_bare_geometry_becomes_anonymous_feature() {
        let layer = parse_layer(r#"{ "type": "Point", "coordinates": [5.5, 45.0] }"#).unwrap();
        assert_eq!(layer.len(), 1);
        assert!(layer.features[0].id.is_empty());
    }

    #[test]
    fn test_unknown_crs_is_a_mismatch() {
        let content = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:3857" } },
            "features": []
        }"#;
        assert!(matches!(
            parse_layer(content),
            Err(AccError::ReferenceSystemMismatchError { .. })
        ));
    }

    #[test]
    fn test_malformed_geojson_is_rejected() {
        assert!(matches!(
            parse_layer("{ \"type\": \"Nope\" }"),
            Err(AccError::GeoJsonError(_))
        ));
    }

    #[test]
    fn test_open_layer_source_dispatches_on_extension() {
        assert!(open_layer_source("parcels.geojson").is_ok());
        assert!(open_layer_source("PARCELS.JSON").is_ok());
        assert!(matches!(
            open_layer_source("parcels.shp"),
            Err(AccError::UnsupportedFormatError { .. })
        ));
    }

    #[test]
    fn test_layer_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.geojson");
        std::fs::write(&path, LAMBERT_COLLECTION).unwrap();

        let source = GeoJsonFile::new(&path);
        assert!(source.describe().contains("layer.geojson"));
        assert_eq!(source.load_layer().unwrap().len(), 3);
    }

    #[test]
    fn test_buffers_export_in_wgs84() {
        let set = generate_buffers(&GeoPoint::new(5.548, 45.055), &BufferSettings::default()).unwrap();
        let collection = buffers_to_feature_collection(&set).unwrap();
        assert_eq!(collection.features.len(), 4);

        let first = &collection.features[0];
        assert_eq!(first.property("name").and_then(Value::as_str), Some("100m"));
        let geometry = geo::Geometry::<f64>::try_from(first.geometry.clone().unwrap()).unwrap();
        let geo::Geometry::Polygon(polygon) = geometry else {
            panic!("expected a polygon");
        };
        let c = polygon.exterior().0[0];
        assert!((c.x - 5.548).abs() < 0.01);
        assert!((c.y - 45.055).abs() < 0.01);
    }

    #[test]
    fn test_write_feature_collection() {
        let set = generate_buffers(&GeoPoint::new(5.548, 45.055), &BufferSettings::default()).unwrap();
        let collection = buffers_to_feature_collection(&set).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffers.geojson");
        write_feature_collection(&path, &collection).unwrap();

        let reread = std::fs::read_to_string(&path).unwrap();
        assert!(reread.contains("production point"));
        let layer = parse_layer(&reread).unwrap();
        assert_eq!(layer.len(), 4);
    }
}
