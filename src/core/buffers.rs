use geo::{coord, Coord, LineString, Point, Polygon};
use std::f64::consts::TAU;

use crate::core::projection::project_point;
use crate::domain::model::{Buffer, BufferMode, BufferSet, BufferSettings, Crs, GeoPoint};
use crate::utils::error::{AccError, Result};

/// Closed ring of `segments` vertices approximating a circle, counter-clockwise.
pub(crate) fn circle_ring(center: Coord<f64>, radius: f64, segments: usize) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = TAU * i as f64 / segments as f64;
            coord! {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    LineString::new(coords)
}

fn disk(center: Point<f64>, radius: f64, segments: usize) -> Polygon<f64> {
    Polygon::new(circle_ring(center.0, radius, segments), vec![])
}

fn annulus(center: Point<f64>, inner: f64, outer: f64, segments: usize) -> Polygon<f64> {
    let mut hole = circle_ring(center.0, inner, segments);
    // Interior rings run clockwise.
    hole.0.reverse();
    Polygon::new(circle_ring(center.0, outer, segments), vec![hole])
}

/// Builds the regulatory buffers around `point`, in Lambert-93.
pub fn generate_buffers(point: &GeoPoint, settings: &BufferSettings) -> Result<BufferSet> {
    point.validate()?;

    if settings.segments < BufferSettings::MIN_SEGMENTS {
        return Err(AccError::InvalidConfigValueError {
            field: "regulation.segments".to_string(),
            value: settings.segments.to_string(),
            reason: format!("At least {} segments are required", BufferSettings::MIN_SEGMENTS),
        });
    }

    let center = project_point(point).map_err(|e| AccError::InvalidPointError {
        reason: e.to_string(),
    })?;

    let mut buffers = Vec::with_capacity(settings.perimeters.len());
    let mut previous: Option<f64> = None;

    for perimeter in &settings.perimeters {
        let radius = perimeter.radius_m;
        if !radius.is_finite() || radius <= 0.0 || previous.is_some_and(|p| radius <= p) {
            return Err(AccError::InvalidConfigValueError {
                field: "regulation.perimeters".to_string(),
                value: radius.to_string(),
                reason: "Radii must be positive and strictly ascending".to_string(),
            });
        }

        let (geometry, inner_radius_m) = match (settings.mode, previous) {
            (BufferMode::Rings, Some(inner)) => {
                (annulus(center, inner, radius, settings.segments), Some(inner))
            }
            _ => (disk(center, radius, settings.segments), None),
        };

        buffers.push(Buffer {
            name: perimeter.name.clone(),
            radius_m: radius,
            inner_radius_m,
            geometry,
        });
        previous = Some(radius);
    }

    tracing::debug!(
        "Generated {} {:?} buffers around ({}, {}) -> ({:.1}, {:.1})",
        buffers.len(),
        settings.mode,
        point.lon,
        point.lat,
        center.x(),
        center.y()
    );

    Ok(BufferSet {
        crs: Crs::Lambert93,
        origin: *point,
        center,
        mode: settings.mode,
        buffers,
    })
}
