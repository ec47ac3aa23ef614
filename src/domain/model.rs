use chrono::{DateTime, Utc};
use geo::{Geometry, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::{AccError, Result};

/// A longitude/latitude pair in degrees (EPSG:4326).
///
/// A missing ordinate is carried as NaN and rejected by [`GeoPoint::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Builds a point from optional ordinates, as supplied by a form.
    pub fn from_parts(lon: Option<f64>, lat: Option<f64>) -> Result<Self> {
        let point = Self {
            lon: lon.unwrap_or(f64::NAN),
            lat: lat.unwrap_or(f64::NAN),
        };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lon.is_nan() {
            return Err(AccError::InvalidPointError {
                reason: "longitude is missing".to_string(),
            });
        }
        if self.lat.is_nan() {
            return Err(AccError::InvalidPointError {
                reason: "latitude is missing".to_string(),
            });
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(AccError::InvalidPointError {
                reason: format!("longitude {} is outside [-180, 180]", self.lon),
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AccError::InvalidPointError {
                reason: format!("latitude {} is outside [-90, 90]", self.lat),
            });
        }
        Ok(())
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.lon, p.lat)
    }
}

/// The two reference systems the crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// EPSG:4326, geographic degrees.
    Wgs84,
    /// EPSG:2154, RGF93 / Lambert-93 metres.
    Lambert93,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::Lambert93 => 2154,
        }
    }

    /// Parses `EPSG:2154`, `urn:ogc:def:crs:EPSG::4326`, `CRS84` and friends.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let id = identifier.trim().to_ascii_uppercase();
        if id.ends_with("CRS84") || id.ends_with("CRS:84") {
            return Some(Crs::Wgs84);
        }
        let code = id.rsplit(':').next()?.trim();
        match code {
            "4326" => Some(Crs::Wgs84),
            "2154" => Some(Crs::Lambert93),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// One regulatory distance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perimeter {
    pub name: String,
    pub radius_m: f64,
}

impl Perimeter {
    pub fn new(name: impl Into<String>, radius_m: f64) -> Self {
        Self {
            name: name.into(),
            radius_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferMode {
    /// Every buffer is the full disk of its radius.
    #[default]
    Disks,
    /// Every buffer is the band between the previous radius and its own.
    Rings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferSettings {
    pub perimeters: Vec<Perimeter>,
    pub mode: BufferMode,
    /// Vertices used to approximate each circle.
    pub segments: usize,
}

impl BufferSettings {
    pub const DEFAULT_SEGMENTS: usize = 64;
    pub const MIN_SEGMENTS: usize = 8;
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            perimeters: vec![
                Perimeter::new("100m", 100.0),
                Perimeter::new("500m", 500.0),
                Perimeter::new("1000m", 1000.0),
            ],
            mode: BufferMode::Disks,
            segments: Self::DEFAULT_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub name: String,
    pub radius_m: f64,
    /// Set in rings mode for every band but the innermost.
    pub inner_radius_m: Option<f64>,
    pub geometry: Polygon<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferSet {
    pub crs: Crs,
    pub origin: GeoPoint,
    /// The origin expressed in `crs`.
    pub center: Point<f64>,
    pub mode: BufferMode,
    pub buffers: Vec<Buffer>,
}

impl BufferSet {
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.buffers.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Option<Geometry<f64>>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry<f64>) -> Self {
        Self {
            id: id.into(),
            geometry: Some(geometry),
            properties: serde_json::Map::new(),
        }
    }
}

/// A vector layer as handed over by the shell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    /// `None` when the source did not declare a reference system.
    pub crs: Option<Crs>,
    pub features: Vec<Feature>,
}

impl Layer {
    pub fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self {
            crs: Some(crs),
            features,
        }
    }

    pub fn empty(crs: Crs) -> Self {
        Self::new(crs, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub buffer: String,
    pub radius_m: f64,
    pub intersects: bool,
    pub count: usize,
    pub feature_ids: Vec<String>,
    /// Distance from the buffer centre to the closest intersecting feature.
    pub min_distance_m: Option<f64>,
}

impl ResultRow {
    pub fn empty(buffer: impl Into<String>, radius_m: f64) -> Self {
        Self {
            buffer: buffer.into(),
            radius_m,
            intersects: false,
            count: 0,
            feature_ids: Vec::new(),
            min_distance_m: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub crs: Crs,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(crs: Crs, rows: Vec<ResultRow>) -> Self {
        Self { crs, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Inclusive upper bound of the triggering radius for this tier.
    pub up_to_m: f64,
    pub label: String,
}

/// Radius range to status label lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub compliant_label: String,
    pub tiers: Vec<Tier>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            compliant_label: "compliant".to_string(),
            tiers: vec![
                Tier {
                    up_to_m: 100.0,
                    label: "prohibited".to_string(),
                },
                Tier {
                    up_to_m: 500.0,
                    label: "restricted".to_string(),
                },
                Tier {
                    up_to_m: 1000.0,
                    label: "monitored".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub label: String,
    pub compliant: bool,
    pub triggering_buffer: Option<String>,
    pub triggering_radius_m: Option<f64>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.triggering_buffer, self.triggering_radius_m) {
            (Some(buffer), Some(radius)) => {
                write!(f, "{} (triggered by {} buffer, {} m)", self.label, buffer, radius)
            }
            _ => write!(f, "{}", self.label),
        }
    }
}

/// Everything one run of the engine produced.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub origin: GeoPoint,
    #[serde(skip)]
    pub buffers: BufferSet,
    pub table: ResultTable,
    pub status: Status,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Producer,
    Consumer,
}

impl fmt::Display for ParticipantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantKind::Producer => write!(f, "producer"),
            ParticipantKind::Consumer => write!(f, "consumer"),
        }
    }
}

/// A producer or consumer taking part in a collective operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: u32,
    pub name: String,
    pub kind: ParticipantKind,
    pub location: GeoPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(5.548, 45.055).validate().is_ok());
        assert!(GeoPoint::new(180.0, -90.0).validate().is_ok());
        assert!(GeoPoint::new(181.0, 45.0).validate().is_err());
        assert!(GeoPoint::new(5.0, 90.5).validate().is_err());
        assert!(GeoPoint::new(f64::NAN, 45.0).validate().is_err());
    }

    #[test]
    fn test_point_from_missing_parts() {
        let err = GeoPoint::from_parts(Some(5.548), None).unwrap_err();
        assert!(matches!(err, AccError::InvalidPointError { .. }));
        assert!(err.to_string().contains("latitude"));

        let point = GeoPoint::from_parts(Some(5.548), Some(45.055)).unwrap();
        assert_eq!(point, GeoPoint::new(5.548, 45.055));
    }

    #[test]
    fn test_crs_identifiers() {
        assert_eq!(Crs::from_identifier("EPSG:2154"), Some(Crs::Lambert93));
        assert_eq!(
            Crs::from_identifier("urn:ogc:def:crs:EPSG::2154"),
            Some(Crs::Lambert93)
        );
        assert_eq!(
            Crs::from_identifier("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Some(Crs::Wgs84)
        );
        assert_eq!(Crs::from_identifier("epsg:4326"), Some(Crs::Wgs84));
        assert_eq!(Crs::from_identifier("EPSG:3857"), None);
        assert_eq!(Crs::Lambert93.to_string(), "EPSG:2154");
    }

    #[test]
    fn test_status_display() {
        let status = Status {
            label: "restricted".to_string(),
            compliant: false,
            triggering_buffer: Some("500m".to_string()),
            triggering_radius_m: Some(500.0),
        };
        assert_eq!(status.to_string(), "restricted (triggered by 500m buffer, 500 m)");
    }
}
