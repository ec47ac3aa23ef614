//! Collective self-consumption perimeter check.
//!
//! Every participant of an operation must fit in a circle of diameter D. The
//! check finds the smallest circle enclosing all participants and compares
//! its radius against D/2.

use geo::{Coord, LineString, Polygon};
use serde::Serialize;
use std::fmt;

use crate::core::buffers::circle_ring;
use crate::core::projection::{from_lambert93, project_point, unproject_point};
use crate::domain::model::{GeoPoint, Participant, ParticipantKind};
use crate::utils::error::{AccError, Result};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_CIRCLE_SEGMENTS: usize = 128;

const KM_EPSILON: f64 = 1e-9;
const METRE_EPSILON: f64 = 1e-7;

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Allowed diameter of the perimeter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerimeterRule {
    /// 2 km.
    Standard,
    /// 10 km, peri-urban derogation.
    Periurban,
    /// 20 km, rural derogation.
    Rural,
    Custom(f64),
}

impl PerimeterRule {
    pub fn from_diameter_km(diameter_km: f64) -> Result<Self> {
        crate::utils::validation::validate_positive_distance("diameter_km", diameter_km)?;
        Ok(match diameter_km {
            d if d == 2.0 => PerimeterRule::Standard,
            d if d == 10.0 => PerimeterRule::Periurban,
            d if d == 20.0 => PerimeterRule::Rural,
            d => PerimeterRule::Custom(d),
        })
    }

    pub fn diameter_km(&self) -> f64 {
        match self {
            PerimeterRule::Standard => 2.0,
            PerimeterRule::Periurban => 10.0,
            PerimeterRule::Rural => 20.0,
            PerimeterRule::Custom(d) => *d,
        }
    }
}

impl Default for PerimeterRule {
    fn default() -> Self {
        PerimeterRule::Standard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle {
    pub center: GeoPoint,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Copy)]
struct PlanarCircle {
    center: Coord<f64>,
    radius: f64,
}

impl PlanarCircle {
    fn point(c: Coord<f64>) -> Self {
        Self {
            center: c,
            radius: 0.0,
        }
    }

    fn diameter(a: Coord<f64>, b: Coord<f64>) -> Self {
        let center = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        Self {
            center,
            radius: distance(a, b) / 2.0,
        }
    }

    /// Circumcircle, `None` for collinear points.
    fn circumscribed(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Option<Self> {
        let (bx, by) = (b.x - a.x, b.y - a.y);
        let (cx, cy) = (c.x - a.x, c.y - a.y);
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < 1e-12 {
            return None;
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        Some(Self {
            center: Coord {
                x: a.x + ux,
                y: a.y + uy,
            },
            radius: (ux * ux + uy * uy).sqrt(),
        })
    }

    fn widest_pair(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Self {
        [Self::diameter(a, b), Self::diameter(a, c), Self::diameter(b, c)]
            .into_iter()
            .max_by(|x, y| x.radius.total_cmp(&y.radius))
            .unwrap_or_else(|| Self::diameter(a, b))
    }

    fn contains(&self, p: Coord<f64>) -> bool {
        distance(self.center, p) <= self.radius + METRE_EPSILON
    }
}

fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Incremental Welzl construction; expected linear for most inputs.
fn planar_enclosing_circle(points: &[Coord<f64>]) -> Option<PlanarCircle> {
    let first = *points.first()?;
    let mut circle = PlanarCircle::point(first);

    for i in 1..points.len() {
        if circle.contains(points[i]) {
            continue;
        }
        circle = PlanarCircle::point(points[i]);
        for j in 0..i {
            if circle.contains(points[j]) {
                continue;
            }
            circle = PlanarCircle::diameter(points[i], points[j]);
            for k in 0..j {
                if circle.contains(points[k]) {
                    continue;
                }
                circle = PlanarCircle::circumscribed(points[i], points[j], points[k])
                    .unwrap_or_else(|| PlanarCircle::widest_pair(points[i], points[j], points[k]));
            }
        }
    }
    Some(circle)
}

/// Smallest circle containing every point, computed in Lambert-93 metres.
pub fn minimal_enclosing_circle(points: &[GeoPoint]) -> Result<Option<Circle>> {
    match points {
        [] => Ok(None),
        [only] => {
            only.validate()?;
            Ok(Some(Circle {
                center: *only,
                radius_km: 0.0,
            }))
        }
        _ => {
            let mut projected = Vec::with_capacity(points.len());
            for point in points {
                point.validate()?;
                projected.push(project_point(point)?.0);
            }
            let Some(circle) = planar_enclosing_circle(&projected) else {
                return Ok(None);
            };
            let center = unproject_point(&circle.center.into())?;
            Ok(Some(Circle {
                center,
                radius_km: circle.radius / 1000.0,
            }))
        }
    }
}

pub fn count_in_range(center: &GeoPoint, radius_km: f64, points: &[GeoPoint]) -> usize {
    points
        .iter()
        .filter(|p| haversine_km(center, p) <= radius_km + KM_EPSILON)
        .count()
}

/// Polygon approximation of a circle, in WGS84 degrees.
pub fn circle_polygon(center: &GeoPoint, radius_km: f64, segments: usize) -> Result<Polygon<f64>> {
    let projected_center = project_point(center)?;
    let ring = circle_ring(projected_center.0, radius_km * 1000.0, segments.max(3));
    let mut coords = Vec::with_capacity(ring.0.len());
    for c in ring.coords() {
        coords.push(from_lambert93(c.x, c.y)?);
    }
    Ok(Polygon::new(LineString::new(coords), vec![]))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantPlacement {
    pub id: u32,
    pub name: String,
    pub kind: ParticipantKind,
    pub location: GeoPoint,
    pub distance_km: f64,
    pub inside: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerimeterReport {
    pub diameter_km: f64,
    /// D/2.
    pub limit_km: f64,
    /// Radius of the minimal enclosing circle.
    pub enclosing_radius_km: f64,
    pub center: GeoPoint,
    pub compliant: bool,
    pub placements: Vec<ParticipantPlacement>,
    /// Names of participants outside the D/2 circle.
    pub limiting: Vec<String>,
}

impl fmt::Display for PerimeterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.compliant {
            write!(
                f,
                "Compliant: D={} km, r*={:.2} km <= D/2={:.2} km",
                self.diameter_km, self.enclosing_radius_km, self.limit_km
            )
        } else {
            let limiting = if self.limiting.is_empty() {
                "-".to_string()
            } else {
                self.limiting.join(", ")
            };
            write!(
                f,
                "Not compliant: D={} km, r*={:.2} km > D/2={:.2} km, limiting points: {}",
                self.diameter_km, self.enclosing_radius_km, self.limit_km, limiting
            )
        }
    }
}

pub fn check_perimeter(participants: &[Participant], rule: PerimeterRule) -> Result<PerimeterReport> {
    if participants.is_empty() {
        return Err(AccError::EmptyPerimeterError);
    }
    if !participants
        .iter()
        .any(|p| p.kind == ParticipantKind::Producer)
    {
        return Err(AccError::NoProducerError {
            participants: participants.len(),
        });
    }

    let locations: Vec<GeoPoint> = participants.iter().map(|p| p.location).collect();
    let circle = minimal_enclosing_circle(&locations)?.ok_or(AccError::EmptyPerimeterError)?;

    let diameter_km = rule.diameter_km();
    let limit_km = diameter_km / 2.0;
    let compliant = circle.radius_km <= limit_km + KM_EPSILON;

    let placements: Vec<ParticipantPlacement> = participants
        .iter()
        .map(|p| {
            let distance_km = haversine_km(&circle.center, &p.location);
            ParticipantPlacement {
                id: p.id,
                name: p.name.clone(),
                kind: p.kind,
                location: p.location,
                distance_km,
                inside: distance_km <= limit_km + KM_EPSILON,
            }
        })
        .collect();

    let limiting = placements
        .iter()
        .filter(|p| !p.inside)
        .map(|p| {
            if p.name.is_empty() {
                p.kind.to_string()
            } else {
                p.name.clone()
            }
        })
        .collect();

    let report = PerimeterReport {
        diameter_km,
        limit_km,
        enclosing_radius_km: circle.radius_km,
        center: circle.center,
        compliant,
        placements,
        limiting,
    };
    tracing::info!("{}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn participant(id: u32, kind: ParticipantKind, lon: f64, lat: f64) -> Participant {
        Participant {
            id,
            name: format!("{} {}", kind, id),
            kind,
            location: GeoPoint::new(lon, lat),
        }
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_km(&GeoPoint::new(5.0, 45.0), &GeoPoint::new(5.0, 46.0));
        assert_abs_diff_eq!(d, 111.19, epsilon = 0.01);
    }

    #[test]
    fn test_enclosing_circle_of_two_points_is_their_diameter() {
        let a = GeoPoint::new(5.50, 45.05);
        let b = GeoPoint::new(5.52, 45.05);
        let circle = minimal_enclosing_circle(&[a, b]).unwrap().unwrap();
        let half = haversine_km(&a, &b) / 2.0;
        assert!((circle.radius_km - half).abs() / half < 0.01);
        assert_abs_diff_eq!(circle.center.lon, 5.51, epsilon = 1e-4);
    }

    #[test]
    fn test_enclosing_circle_ignores_interior_points() {
        let outer = [
            GeoPoint::new(5.50, 45.05),
            GeoPoint::new(5.52, 45.05),
            GeoPoint::new(5.51, 45.07),
        ];
        let mut with_inner = outer.to_vec();
        with_inner.push(GeoPoint::new(5.51, 45.055));

        let a = minimal_enclosing_circle(&outer).unwrap().unwrap();
        let b = minimal_enclosing_circle(&with_inner).unwrap().unwrap();
        assert_abs_diff_eq!(a.radius_km, b.radius_km, epsilon = 1e-9);
    }

    #[test]
    fn test_enclosing_circle_of_collinear_points() {
        let points = [
            GeoPoint::new(5.50, 45.05),
            GeoPoint::new(5.51, 45.05),
            GeoPoint::new(5.52, 45.05),
        ];
        let circle = minimal_enclosing_circle(&points).unwrap().unwrap();
        let half = haversine_km(&points[0], &points[2]) / 2.0;
        assert!((circle.radius_km - half).abs() / half < 0.01);
    }

    #[test]
    fn test_enclosing_circle_edge_cases() {
        assert!(minimal_enclosing_circle(&[]).unwrap().is_none());
        let single = minimal_enclosing_circle(&[GeoPoint::new(5.5, 45.0)]).unwrap().unwrap();
        assert_eq!(single.radius_km, 0.0);
        assert!(minimal_enclosing_circle(&[GeoPoint::new(500.0, 45.0)]).is_err());
    }

    #[test]
    fn test_compact_operation_is_compliant() {
        let participants = vec![
            participant(1, ParticipantKind::Producer, 5.548, 45.055),
            participant(2, ParticipantKind::Consumer, 5.556, 45.058),
            participant(3, ParticipantKind::Consumer, 5.543, 45.049),
        ];
        let report = check_perimeter(&participants, PerimeterRule::Standard).unwrap();
        assert!(report.compliant);
        assert!(report.limiting.is_empty());
        assert!(report.placements.iter().all(|p| p.inside));
        assert!(report.to_string().starts_with("Compliant"));
    }

    #[test]
    fn test_spread_operation_lists_limiting_points() {
        let participants = vec![
            participant(1, ParticipantKind::Producer, 5.548, 45.055),
            participant(2, ParticipantKind::Consumer, 5.60, 45.055),
        ];
        let report = check_perimeter(&participants, PerimeterRule::Standard).unwrap();
        assert!(!report.compliant);
        assert!(report.enclosing_radius_km > 1.0);
        assert_eq!(report.limiting.len(), 2);

        let relaxed = check_perimeter(&participants, PerimeterRule::Periurban).unwrap();
        assert!(relaxed.compliant);
    }

    #[test]
    fn test_perimeter_requires_a_producer() {
        assert!(matches!(
            check_perimeter(&[], PerimeterRule::Standard),
            Err(AccError::EmptyPerimeterError)
        ));
        let consumers = vec![participant(1, ParticipantKind::Consumer, 5.5, 45.0)];
        assert!(matches!(
            check_perimeter(&consumers, PerimeterRule::Standard),
            Err(AccError::NoProducerError { participants: 1 })
        ));
    }

    #[test]
    fn test_rule_from_diameter() {
        assert_eq!(PerimeterRule::from_diameter_km(2.0).unwrap(), PerimeterRule::Standard);
        assert_eq!(PerimeterRule::from_diameter_km(20.0).unwrap(), PerimeterRule::Rural);
        assert_eq!(PerimeterRule::from_diameter_km(3.5).unwrap().diameter_km(), 3.5);
        assert!(PerimeterRule::from_diameter_km(0.0).is_err());
    }

    #[test]
    fn test_count_in_range_and_circle_polygon() {
        let center = GeoPoint::new(5.548, 45.055);
        let pois = [
            GeoPoint::new(5.549, 45.055),
            GeoPoint::new(5.70, 45.055),
        ];
        assert_eq!(count_in_range(&center, 1.0, &pois), 1);

        let polygon = circle_polygon(&center, 1.0, DEFAULT_CIRCLE_SEGMENTS).unwrap();
        assert_eq!(polygon.exterior().0.len(), DEFAULT_CIRCLE_SEGMENTS + 1);
        for c in polygon.exterior().coords() {
            let d = haversine_km(&center, &GeoPoint::new(c.x, c.y));
            assert!((d - 1.0).abs() < 0.01, "vertex at {} km", d);
        }
    }
}
