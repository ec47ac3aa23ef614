//! RGF93 / Lambert-93 (EPSG:2154) conversions.
//!
//! Lambert conformal conic with two standard parallels on the GRS80
//! ellipsoid. Forward and inverse formulas follow the IGN algorithms
//! (ALG0003, ALG0004); the inverse latitude is solved by fixed-point
//! iteration.

use geo::{coord, Coord, Geometry, MapCoords, Point, Rect};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::OnceLock;

use crate::domain::model::{Crs, GeoPoint, Layer};
use crate::utils::error::{AccError, Result};

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const INVERSE_FLATTENING: f64 = 298.257_222_101;
const STANDARD_PARALLEL_1: f64 = 49.0;
const STANDARD_PARALLEL_2: f64 = 44.0;
const LATITUDE_OF_ORIGIN: f64 = 46.5;
const CENTRAL_MERIDIAN: f64 = 3.0;
const FALSE_EASTING: f64 = 700_000.0;
const FALSE_NORTHING: f64 = 6_600_000.0;

const MAX_ITERATIONS: usize = 20;
const LATITUDE_TOLERANCE: f64 = 1e-12;

struct ConicParameters {
    e: f64,
    n: f64,
    /// `a * F` in the usual notation.
    scaled_f: f64,
    rho0: f64,
}

fn parameters() -> &'static ConicParameters {
    static PARAMS: OnceLock<ConicParameters> = OnceLock::new();
    PARAMS.get_or_init(|| {
        let f = 1.0 / INVERSE_FLATTENING;
        let e = (2.0 * f - f * f).sqrt();
        let phi1 = STANDARD_PARALLEL_1.to_radians();
        let phi2 = STANDARD_PARALLEL_2.to_radians();
        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);
        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let scaled_f = SEMI_MAJOR_AXIS * m1 / (n * t1.powf(n));
        let rho0 = scaled_f * t(LATITUDE_OF_ORIGIN.to_radians(), e).powf(n);
        ConicParameters {
            e,
            n,
            scaled_f,
            rho0,
        }
    })
}

fn m(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / (1.0 - e * e * s * s).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}

/// Geographic degrees to Lambert-93 metres.
pub fn to_lambert93(lon: f64, lat: f64) -> Result<Coord<f64>> {
    let p = parameters();
    let rho = p.scaled_f * t(lat.to_radians(), p.e).powf(p.n);
    let theta = p.n * (lon - CENTRAL_MERIDIAN).to_radians();
    let x = FALSE_EASTING + rho * theta.sin();
    let y = FALSE_NORTHING + p.rho0 - rho * theta.cos();

    if !x.is_finite() || !y.is_finite() {
        return Err(AccError::ProjectionError {
            message: format!("({}, {}) has no Lambert-93 image", lon, lat),
        });
    }
    Ok(coord! { x: x, y: y })
}

/// Lambert-93 metres back to geographic degrees.
pub fn from_lambert93(x: f64, y: f64) -> Result<Coord<f64>> {
    let p = parameters();
    let dx = x - FALSE_EASTING;
    let dy = p.rho0 - (y - FALSE_NORTHING);
    let rho = (dx * dx + dy * dy).sqrt();
    let theta = dx.atan2(dy);
    let t_value = (rho / p.scaled_f).powf(1.0 / p.n);

    let mut phi = FRAC_PI_2 - 2.0 * t_value.atan();
    for _ in 0..MAX_ITERATIONS {
        let s = phi.sin();
        let next = FRAC_PI_2
            - 2.0 * (t_value * ((1.0 - p.e * s) / (1.0 + p.e * s)).powf(p.e / 2.0)).atan();
        let delta = (next - phi).abs();
        phi = next;
        if delta < LATITUDE_TOLERANCE {
            break;
        }
    }

    let lon = (theta / p.n).to_degrees() + CENTRAL_MERIDIAN;
    let lat = phi.to_degrees();
    if !lon.is_finite() || !lat.is_finite() {
        return Err(AccError::ProjectionError {
            message: format!("({}, {}) is outside the Lambert-93 domain", x, y),
        });
    }
    Ok(coord! { x: lon, y: lat })
}

pub fn reproject_coord(c: Coord<f64>, from: Crs, to: Crs) -> Result<Coord<f64>> {
    match (from, to) {
        (Crs::Wgs84, Crs::Lambert93) => to_lambert93(c.x, c.y),
        (Crs::Lambert93, Crs::Wgs84) => from_lambert93(c.x, c.y),
        _ => Ok(c),
    }
}

pub fn reproject_geometry(geometry: &Geometry<f64>, from: Crs, to: Crs) -> Result<Geometry<f64>> {
    if from == to {
        return Ok(geometry.clone());
    }
    geometry.try_map_coords(move |c| reproject_coord(c, from, to))
}

pub fn project_point(point: &GeoPoint) -> Result<Point<f64>> {
    to_lambert93(point.lon, point.lat).map(Point::from)
}

pub fn unproject_point(point: &Point<f64>) -> Result<GeoPoint> {
    let c = from_lambert93(point.x(), point.y())?;
    Ok(GeoPoint::new(c.x, c.y))
}

/// Envelope in which coordinates of a given system are believable.
///
/// For Lambert-93 this is the published EPSG:2154 projected extent with some
/// margin; degree values tagged as metres fall far outside it.
pub fn plausible_extent(crs: Crs) -> Rect<f64> {
    match crs {
        Crs::Wgs84 => Rect::new(coord! { x: -180.0, y: -90.0 }, coord! { x: 180.0, y: 90.0 }),
        Crs::Lambert93 => Rect::new(
            coord! { x: -500_000.0, y: 5_900_000.0 },
            coord! { x: 1_500_000.0, y: 7_400_000.0 },
        ),
    }
}

impl Layer {
    /// Returns a copy of the layer with every geometry expressed in `target`.
    pub fn to_crs(&self, target: Crs) -> Result<Layer> {
        let source = self.crs.ok_or_else(|| AccError::ReferenceSystemMismatchError {
            expected: target.to_string(),
            found: "undefined".to_string(),
        })?;

        let mut features = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let mut reprojected = feature.clone();
            if let Some(geometry) = &feature.geometry {
                reprojected.geometry = Some(reproject_geometry(geometry, source, target)?);
            }
            features.push(reprojected);
        }

        tracing::debug!(
            "Reprojected {} features from {} to {}",
            features.len(),
            source,
            target
        );
        Ok(Layer {
            crs: Some(target),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Feature;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_projection_origin() {
        let c = to_lambert93(3.0, 46.5).unwrap();
        assert_abs_diff_eq!(c.x, 700_000.0, epsilon = 1e-6);
        assert_abs_diff_eq!(c.y, 6_600_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip_over_france() {
        for &(lon, lat) in &[(5.548, 45.055), (-4.48, 48.39), (7.75, 48.58), (2.35, 48.85), (9.45, 42.7)] {
            let c = to_lambert93(lon, lat).unwrap();
            let back = from_lambert93(c.x, c.y).unwrap();
            assert_abs_diff_eq!(back.x, lon, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, lat, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_projected_distances_are_metric() {
        // One arc-minute of latitude is close to 1852 m.
        let a = to_lambert93(5.548, 45.0).unwrap();
        let b = to_lambert93(5.548, 45.0 + 1.0 / 60.0).unwrap();
        let d = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
        assert!((d - 1852.0).abs() < 10.0, "distance was {}", d);
    }

    #[test]
    fn test_layer_to_crs() {
        let layer = Layer::new(
            Crs::Wgs84,
            vec![Feature::new("a", Geometry::Point(Point::new(3.0, 46.5)))],
        );
        let projected = layer.to_crs(Crs::Lambert93).unwrap();
        assert_eq!(projected.crs, Some(Crs::Lambert93));
        match projected.features[0].geometry.as_ref().unwrap() {
            Geometry::Point(p) => {
                assert_abs_diff_eq!(p.x(), 700_000.0, epsilon = 1e-6);
                assert_abs_diff_eq!(p.y(), 6_600_000.0, epsilon = 1e-6);
            }
            other => panic!("unexpected geometry {:?}", other),
        }
    }

    #[test]
    fn test_layer_without_crs_cannot_be_reprojected() {
        let layer = Layer {
            crs: None,
            features: Vec::new(),
        };
        assert!(matches!(
            layer.to_crs(Crs::Lambert93),
            Err(AccError::ReferenceSystemMismatchError { .. })
        ));
    }
}
